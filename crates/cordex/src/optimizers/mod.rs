mod optimizer;

pub(crate) use optimizer::*;
