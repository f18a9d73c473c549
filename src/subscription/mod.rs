// Type-keyed subscriber registry

mod registry;

pub use registry::{Handler, SubscriberRegistry, Subscription};
