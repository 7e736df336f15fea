//! Specification compiler for a command-line model editor: the vocabulary
//! file becomes a typed command table, and user commands compile to backend
//! calls.

pub mod api;
pub mod backend;
pub mod compile;
pub mod error;
pub mod focus;
pub mod grammar;
pub mod resolve;
pub mod section;
pub mod session;
pub mod store;
pub mod table;
pub mod types;
pub mod uiargs;
pub mod value;

pub type Result<T> = anyhow::Result<T>;

pub use api::{Api, ApiConfig};
pub use backend::{Backend, DiagnosticBackend, Rows, SqliteBackend};
pub use compile::{CallCompiler, CallDescriptor};
pub use error::CommandError;
pub use focus::FocusStore;
pub use section::{SpecDocument, parse_document, read_document};
pub use session::{Mode, Session};
pub use store::{CallRecord, create_store, derive_db_path, open_store};
pub use table::CommandTable;
pub use types::{TypeRegistry, Validator};
pub use value::{ArgMap, Value};

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::section::parse_document;
    use crate::table::CommandTable;
    use crate::types::TypeRegistry;

    pub const SAMPLE_SPEC: &str = "\
# sample vocabulary
[types]
name : string
short_name : string
rnum : integer
ratio : float
flag : bool
kind : [public|private]
color : [red|green|blue]
[commands]
domain, d : name
    new : new_domain
        m> ph|phrase:name, [alias:short_name]
    delete : delete_domain
        f> domain
    getall : getall_domains
        o> name, alias
class, c : name
    attach : attach_class
        f> [d|domain:domain]
    new : new_class
        m> n|name:name
        f> d|domain:domain
        m> [import:flag]
    set : set_class_kind
        f> [cl|class:class], [d|domain:domain]
        m> k|kind:kind
rel, r : rnum
    new : new_rel
        f> [d|domain:domain]
        m> [ratio:ratio]
        o> rnum
paint : color
    use : use_color
        m> [count:rnum]
model
    show : show_model
        o> name
";

    pub fn sample() -> anyhow::Result<(TypeRegistry, CommandTable)> {
        let doc = parse_document(SAMPLE_SPEC)?;
        Ok(crate::api::build(&doc)?)
    }
}
