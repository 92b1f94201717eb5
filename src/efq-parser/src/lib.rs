//! efq-parser: Parsers for the efq query DSL
//!
//! Clients describe a listing with a flat map of keys to short fragment
//! strings. This crate turns each fragment into a typed value; assembling the
//! fragments into a query is the job of `efq-query`.
//!
//! # Quick Start
//!
//! ```rust
//! use efq_parser::{parse_field, parse_pager, ConditionValue, Operator, PagerMode, Scalar};
//!
//! let leaves = parse_field("field_price--10--<=")?;
//! assert_eq!(leaves[0].field, "field_price");
//! assert_eq!(leaves[0].value, ConditionValue::Compare(Scalar::Int(10), Operator::Le));
//!
//! let pager = parse_pager("2-10--restricted-5")?;
//! assert_eq!(pager.mode, PagerMode::Restricted(5));
//! # Ok::<(), efq_parser::ParseError>(())
//! ```
//!
//! # Grammar
//!
//! | key               | fragment                                 |
//! |-------------------|------------------------------------------|
//! | `field`           | `name--value--OP[,name--value--OP]`      |
//! | `category`        | `field--tid-tid`                         |
//! | `categories`      | `field--tid-tid[,field2--tid]`           |
//! | `category_ignore` | `field--tid-tid`                         |
//! | `date`            | `field--YYYY-MM-DD,YYYY-MM-DD`           |
//! | `byMonth`         | `field--DD-MM-YYYY`                      |
//! | `sort`            | `field-DIRECTION[,field2-DIRECTION]`     |
//! | `range`           | `start-length`                           |
//! | `paged`           | `page-perPage[--mode]`                   |
//! | `address`         | `field--column--value`                   |

#![deny(missing_docs)]
#![warn(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod ast;
pub mod date;
pub mod error;
mod parser;

pub use ast::*;
pub use date::{
    date_field, fallback_window, last_day_of_month, overlap_group, parse_by_month, parse_date,
    DateFormats,
};
pub use error::*;
pub use parser::*;

pub use efq_shared::VERSION;
