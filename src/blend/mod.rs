pub(crate) mod compiled;
pub(crate) mod ops;
