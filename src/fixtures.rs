//! Demo dataset shown by list views when `use_fixture_data` is enabled and
//! the backend cannot be reached.

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{Bucket, FileRecord, ReleaseNote};

fn day(year: i32, month: u32, date: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, date)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

pub fn buckets() -> Vec<Bucket> {
    vec![
        Bucket {
            id: 1,
            title: "Version 1.0.0 Release".into(),
            slug: "version-1-0-0-release".into(),
            created_at: day(2024, 4, 30),
            updated_at: None,
        },
        Bucket {
            id: 2,
            title: "Version 1.1.0 Release".into(),
            slug: "version-1-1-0-release".into(),
            created_at: day(2024, 5, 1),
            updated_at: None,
        },
        Bucket {
            id: 3,
            title: "Version 1.2.0 Release".into(),
            slug: "version-1-2-0-release".into(),
            created_at: day(2024, 5, 2),
            updated_at: None,
        },
    ]
}

pub fn files() -> Vec<FileRecord> {
    vec![
        FileRecord {
            id: 1,
            bucket_id: 1,
            name: "changelog.md".into(),
            slug: "changelog-md".into(),
            description: "Full changelog for 1.0.0".into(),
            content: Some("# Changelog\n\n- Initial release\n".into()),
            is_published: true,
            file_size: Some(30),
            file_type: Some("text/markdown".into()),
            created_at: day(2024, 4, 30),
            updated_at: None,
        },
        FileRecord {
            id: 2,
            bucket_id: 2,
            name: "upgrade-guide.md".into(),
            slug: "upgrade-guide-md".into(),
            description: "Upgrading from 1.0.x".into(),
            content: Some("## Upgrading\n\nRun the migration first.\n".into()),
            is_published: false,
            file_size: Some(39),
            file_type: Some("text/markdown".into()),
            created_at: day(2024, 5, 1),
            updated_at: None,
        },
    ]
}

pub fn release_notes() -> Vec<ReleaseNote> {
    vec![
        ReleaseNote {
            id: 1,
            title: "Version 1.0.0 Release".into(),
            slug: "version-1-0-0-release".into(),
            content: "# 1.0.0\n\nFirst public release.".into(),
            version: "1.0.0".into(),
            release_date: day(2024, 4, 30),
            is_published: true,
            created_at: day(2024, 4, 30),
            updated_at: None,
        },
        ReleaseNote {
            id: 2,
            title: "Version 1.1.0 Release".into(),
            slug: "version-1-1-0-release".into(),
            content: "# 1.1.0\n\n| Area | Change |\n|---|---|\n| files | download |".into(),
            version: "1.1.0".into(),
            release_date: day(2024, 5, 1),
            is_published: false,
            created_at: day(2024, 5, 1),
            updated_at: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slug::slugify;

    #[test]
    fn fixture_slugs_match_their_titles() {
        for bucket in buckets() {
            assert_eq!(bucket.slug, slugify(&bucket.title));
        }
        for note in release_notes() {
            assert_eq!(note.slug, slugify(&note.title));
        }
        for file in files() {
            assert_eq!(file.slug, slugify(&file.name));
        }
    }

    #[test]
    fn fixture_files_point_at_fixture_buckets() {
        let ids: Vec<i64> = buckets().iter().map(|b| b.id).collect();
        assert!(files().iter().all(|f| ids.contains(&f.bucket_id)));
    }
}
