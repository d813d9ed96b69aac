// Core modules implementing the file-set model, deletion, and error modeling.
pub mod error;
pub mod fileset;
pub mod reset;
