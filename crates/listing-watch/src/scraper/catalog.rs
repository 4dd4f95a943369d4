use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::domain::ListingRef;
use super::repository::{ListingSource, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unable to read listing catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed listing catalog: {0}")]
    Csv(#[from] csv::Error),
}

impl From<CatalogError> for RepositoryError {
    fn from(value: CatalogError) -> Self {
        RepositoryError::Unavailable(value.to_string())
    }
}

/// In-memory snapshot of the property catalog.
#[derive(Debug, Clone, Default)]
pub struct ListingCatalog {
    listings: Vec<ListingRef>,
}

impl ListingCatalog {
    pub fn new(listings: Vec<ListingRef>) -> Self {
        Self { listings }
    }

    /// Parse a property export. Rows without a listing URL are dropped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut listings = Vec::new();

        for record in csv_reader.deserialize::<CatalogRow>() {
            let row = record?;
            match row.apartment_list_url {
                Some(url) => listings.push(ListingRef::new(row.name, url)),
                None => debug!(name = %row.name, "catalog row has no listing url"),
            }
        }

        Ok(Self { listings })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn listings(&self) -> &[ListingRef] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[async_trait]
impl ListingSource for ListingCatalog {
    async fn list(&self) -> Result<Vec<ListingRef>, RepositoryError> {
        Ok(self.listings.clone())
    }
}

/// Catalog file that is re-read on every cycle, so edits land on the next run.
#[derive(Debug, Clone)]
pub struct CsvListingFile {
    path: PathBuf,
}

impl CsvListingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ListingSource for CsvListingFile {
    async fn list(&self) -> Result<Vec<ListingRef>, RepositoryError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| CatalogError::Io {
                path: self.path.clone(),
                source,
            })?;
        let catalog = ListingCatalog::from_reader(&bytes[..])?;
        Ok(catalog.listings)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    apartment_list_url: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "name,apartment_list_url,property_email,type_of_building,status\n\
Riverside Lofts,https://www.apartmentlist.com/tx/austin/riverside-lofts,leasing@riverside.test,Apartment,active\n\
Harbor Point,,harbor@point.test,Condo,\n\
Maple Court , https://maple-court.test/units ,maple@court.test,Townhouse,inactive\n";

    #[test]
    fn parses_rows_with_urls_and_drops_blank_ones() {
        let catalog = ListingCatalog::from_reader(EXPORT.as_bytes()).expect("catalog parses");
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.listings()[0],
            ListingRef::new(
                "Riverside Lofts",
                "https://www.apartmentlist.com/tx/austin/riverside-lofts"
            )
        );
        assert_eq!(catalog.listings()[1].title, "Maple Court");
        assert_eq!(catalog.listings()[1].url, "https://maple-court.test/units");
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let csv = "name,apartment_list_url\nSolo,https://www.apartmentlist.com/solo\n";
        let catalog = ListingCatalog::from_reader(csv.as_bytes()).expect("catalog parses");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let csv = "apartment_list_url\nhttps://www.apartmentlist.com/solo\n";
        let err = ListingCatalog::from_reader(csv.as_bytes()).expect_err("name is required");
        assert!(matches!(err, CatalogError::Csv(_)));
    }

    #[tokio::test]
    async fn missing_file_surfaces_as_unavailable_source() {
        let source = CsvListingFile::new("does/not/exist.csv");
        let err = source.list().await.expect_err("file is missing");
        assert!(matches!(err, RepositoryError::Unavailable(message) if message.contains("does/not/exist.csv")));
    }
}
