pub(crate) use self::ctrl::{install, PreviousHandler};

mod ctrl;
