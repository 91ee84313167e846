pub mod bundle;
pub mod resolver;

pub use bundle::{AppBundle, AppDescriptor};
pub use resolver::{AppResolver, MatchRule, RelatedFile, RelatedKind};
