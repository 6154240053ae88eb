//! Process-tree termination for the worker subprocess supervisor.
//!
//! Enumerates the process tree rooted at a pid and sends `SIGKILL` to
//! every descendant leaf-first, then to the root. Descendant enumeration
//! is done directly against `/proc` on Linux; other platforms fall back
//! to killing the root pid only (documented, not silently wrong).

use crate::trace::TraceWriter;
#[cfg(target_os = "linux")]
use std::collections::HashMap;

/// Kill the process tree rooted at `root_pid` with `SIGKILL`, descendants
/// first. Failures killing individual descendants are logged and do not
/// abort the sweep.
#[cfg(target_os = "linux")]
pub fn kill_process_tree(root_pid: u32, trace: &dyn TraceWriter) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let children_by_parent = read_parent_child_map();
    let mut order = Vec::new();
    collect_descendants_postorder(root_pid, &children_by_parent, &mut order);
    order.push(root_pid);

    for pid in order {
        match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) => trace.info(&format!("Sent SIGKILL to pid {pid}")),
            Err(e) => trace.warning(&format!("Failed to kill pid {pid}: {e}")),
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn kill_process_tree(root_pid: u32, trace: &dyn TraceWriter) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        trace.warning("Descendant enumeration is only implemented for Linux; killing root pid only");
        if let Err(e) = kill(Pid::from_raw(root_pid as i32), Signal::SIGKILL) {
            trace.warning(&format!("Failed to kill pid {root_pid}: {e}"));
        }
    }
    #[cfg(not(unix))]
    {
        trace.warning(&format!(
            "Process-tree kill is not supported on this platform; pid {root_pid} left running"
        ));
    }
}

/// Build a map of pid -> direct children by scanning `/proc/*/stat`.
#[cfg(target_os = "linux")]
fn read_parent_child_map() -> HashMap<u32, Vec<u32>> {
    let mut map: HashMap<u32, Vec<u32>> = HashMap::new();

    let entries = match std::fs::read_dir("/proc") {
        Ok(e) => e,
        Err(_) => return map,
    };

    for entry in entries.flatten() {
        let pid: u32 = match entry.file_name().to_str().and_then(|s| s.parse().ok()) {
            Some(p) => p,
            None => continue,
        };

        let stat_path = entry.path().join("stat");
        let stat = match std::fs::read_to_string(&stat_path) {
            Ok(s) => s,
            Err(_) => continue,
        };

        // Format: "pid (comm) state ppid ...". The comm field may contain
        // spaces or parentheses, so split on the last ')' before parsing.
        if let Some(close_paren) = stat.rfind(')') {
            let rest = &stat[close_paren + 1..];
            let mut fields = rest.split_whitespace();
            fields.next(); // state
            if let Some(ppid_str) = fields.next() {
                if let Ok(ppid) = ppid_str.parse::<u32>() {
                    map.entry(ppid).or_default().push(pid);
                }
            }
        }
    }

    map
}

/// Depth-first, post-order traversal so leaves are killed before their
/// ancestors (but the root itself is appended separately by the caller).
#[cfg(target_os = "linux")]
fn collect_descendants_postorder(
    pid: u32,
    children_by_parent: &HashMap<u32, Vec<u32>>,
    out: &mut Vec<u32>,
) {
    if let Some(children) = children_by_parent.get(&pid) {
        for &child in children {
            collect_descendants_postorder(child, children_by_parent, out);
            out.push(child);
        }
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn postorder_visits_leaves_before_ancestors() {
        let mut map = HashMap::new();
        map.insert(1u32, vec![2, 3]);
        map.insert(2u32, vec![4]);

        let mut out = Vec::new();
        collect_descendants_postorder(1, &map, &mut out);

        // 4 is a descendant of 2, so it must appear before 2.
        let pos_4 = out.iter().position(|&p| p == 4).unwrap();
        let pos_2 = out.iter().position(|&p| p == 2).unwrap();
        assert!(pos_4 < pos_2);
        assert!(out.contains(&3));
    }
}
