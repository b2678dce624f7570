pub mod bsp;
pub mod catalog;
pub mod ent_tokenizer;
pub mod err;
pub mod mdl;
pub mod pak;
pub mod resgen;
pub mod resource_name;
pub mod rfa;
pub mod wad;

pub use crate::catalog::ResourceCatalog;
pub use crate::ent_tokenizer::{EntTokenizer, KeyValuePair};
pub use crate::err::{EntParseError, Error, Result};
pub use crate::resgen::{ResGen, ResGenSettings, ResStatus};
