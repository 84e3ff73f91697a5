//! HTTP surface for the SQL mediation pipeline.
//!
//! | Route                  | Body                          |
//! |------------------------|-------------------------------|
//! | `POST /sql/tables`     | none                          |
//! | `POST /sql/describe`   | `{schema?, table}`            |
//! | `POST /sql/query`      | `{sqlText}`                   |
//! | `POST /sql/ask-<name>` | `{question, tables?, includeRaw?}` |

mod error;
mod server;
mod sql;

pub use error::{ApiError, ErrorBody, ServeError};
pub use server::{router, serve, AppState, API_TOKEN_HEADER};
pub use sql::{AskBody, AskResponse, DescribeBody, QueryBody};
