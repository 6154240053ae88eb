// mr-broker: the typed surface over the shared Redis-compatible broker.
//
// `Broker` owns the connection and knows the keyspace conventions;
// `Store<T>` is the generic entity-hash abstraction used to read and
// write jobs and nodes.

pub mod broker;
pub mod store;

pub use broker::{Broker, BrokerError, Subscription};
pub use store::{EntityError, Store};
