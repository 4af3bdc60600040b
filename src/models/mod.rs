pub mod alert;
pub mod observation;
pub mod notification;

pub use alert::{Alert, AlertDocument, AlertKind, NewAlert, SentimentDirection, Trigger};
pub use notification::{FiringEvent, Notification};
pub use observation::{MarketObservation, SentimentLabel, SentimentObservation};
