pub mod address;
pub mod error;
pub mod filter;
pub mod table;
pub mod tsv;
pub mod value;

pub use address::{CellAddress, column_index, column_letter};
pub use error::{ErrorKind, SheetError};
pub use filter::{Constraints, MatchPolicy, filter_records, find_first};
pub use table::{HeaderIndex, Record, Table, decode_table, encode_table, normalize_name};
pub use value::TaggedValue;
