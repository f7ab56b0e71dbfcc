use reqwest::Method;
use std::fmt;

use crate::errors::{AppError, AppResult};

/// How a batch is applied to the remote story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadVerb {
    /// Replace the story contents. Used for the first batch.
    Create,
    /// Add files to the story. Used for every batch after the first.
    Update,
}

impl UploadVerb {
    pub fn for_batch(index: usize) -> Self {
        if index == 0 {
            UploadVerb::Create
        } else {
            UploadVerb::Update
        }
    }

    pub fn method(self) -> Method {
        match self {
            UploadVerb::Create => Method::PUT,
            UploadVerb::Update => Method::PATCH,
        }
    }
}

impl fmt::Display for UploadVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method())
    }
}

/// A contiguous `start..end` range of the discovered file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn verb(&self) -> UploadVerb {
        UploadVerb::for_batch(self.index)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.start..self.end]
    }
}

/// Split `total` items into `ceil(total / batch_size)` ordered batches.
/// Only the last batch may be short.
pub fn plan_batches(total: usize, batch_size: usize) -> AppResult<Vec<Batch>> {
    if batch_size == 0 {
        return Err(AppError::validation("batch_size", "Must be greater than 0"));
    }

    let batches = (0..total.div_ceil(batch_size))
        .map(|index| {
            let start = index * batch_size;
            Batch {
                index,
                start,
                end: (start + batch_size).min(total),
            }
        })
        .collect();

    Ok(batches)
}
