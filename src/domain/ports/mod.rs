pub mod document_store;

pub use document_store::{
    merge_patch, Cascade, Document, DocumentStore, Filter, Query, Sort, SortOrder,
};
