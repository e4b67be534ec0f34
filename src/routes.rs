//! Page addresses of the console.
//!
//! - `/`                             bucket list
//! - `/buckets/new`                  new bucket form
//! - `/buckets/{id}`                 bucket details (bucket + its files)
//! - `/buckets/{id}/edit`            bucket edit form
//! - `/buckets/{id}/files/new`       new file form, preset to that bucket
//! - `/files`                        file list
//! - `/files/new`                    new file form, bucket chosen in the form
//! - `/files/{id}/edit`              file edit form
//! - `/release-notes`                release note list
//! - `/release-notes/new`            new release note form
//! - `/release-notes/{id}/edit`      release note edit form

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Buckets,
    NewBucket,
    BucketDetails(i64),
    EditBucket(i64),
    NewFile { bucket_id: Option<i64> },
    Files,
    EditFile(i64),
    ReleaseNotes,
    NewReleaseNote,
    EditReleaseNote(i64),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown route `{0}`")]
pub struct ParseRouteError(pub String);

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Buckets => f.write_str("/"),
            Route::NewBucket => f.write_str("/buckets/new"),
            Route::BucketDetails(id) => write!(f, "/buckets/{id}"),
            Route::EditBucket(id) => write!(f, "/buckets/{id}/edit"),
            Route::NewFile {
                bucket_id: Some(bucket_id),
            } => write!(f, "/buckets/{bucket_id}/files/new"),
            Route::NewFile { bucket_id: None } => f.write_str("/files/new"),
            Route::Files => f.write_str("/files"),
            Route::EditFile(id) => write!(f, "/files/{id}/edit"),
            Route::ReleaseNotes => f.write_str("/release-notes"),
            Route::NewReleaseNote => f.write_str("/release-notes/new"),
            Route::EditReleaseNote(id) => write!(f, "/release-notes/{id}/edit"),
        }
    }
}

impl FromStr for Route {
    type Err = ParseRouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split('/').filter(|seg| !seg.is_empty()).collect();
        let id = |raw: &&str| raw.parse::<i64>().map_err(|_| ParseRouteError(s.to_string()));

        let route = match segments.as_slice() {
            [] | ["buckets"] => Route::Buckets,
            ["buckets", "new"] => Route::NewBucket,
            ["buckets", raw] => Route::BucketDetails(id(raw)?),
            ["buckets", raw, "edit"] => Route::EditBucket(id(raw)?),
            ["buckets", raw, "files", "new"] => Route::NewFile {
                bucket_id: Some(id(raw)?),
            },
            ["files"] => Route::Files,
            ["files", "new"] => Route::NewFile { bucket_id: None },
            ["files", raw, "edit"] => Route::EditFile(id(raw)?),
            ["release-notes"] => Route::ReleaseNotes,
            ["release-notes", "new"] => Route::NewReleaseNote,
            ["release-notes", raw, "edit"] => Route::EditReleaseNote(id(raw)?),
            _ => return Err(ParseRouteError(s.to_string())),
        };
        Ok(route)
    }
}
