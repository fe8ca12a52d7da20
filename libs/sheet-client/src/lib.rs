pub mod credentials;
pub mod google;
pub mod store;

pub use credentials::{BearerToken, ServiceAccount, ServiceAccountIssuer, TokenSource};
pub use google::{GoogleSheets, SheetsEndpoints};
pub use store::{CellUpdate, SheetRef, SheetStore, TableSource};
