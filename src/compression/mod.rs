pub mod bitpack;
pub mod compress;
pub mod delta;
pub mod vbyte;
