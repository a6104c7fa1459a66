pub(crate) use self::sigint::{install, PreviousHandler};

mod sigint;
