//! Directory-backed fragment store.
//!
//! Layout: `<root>/fragments/<id>.json` holds one serialized
//! [`FragmentRecord`] each; `<root>/styles.xml` holds the harvested style
//! catalog shared by all fragments in the store.

use std::fs;
use std::path::{Path, PathBuf};

use docweave::{
    Error, FragmentRecord, FragmentStore, Harvest, Result, StyleCatalog, StyleStore,
};

const FRAGMENTS_DIR: &str = "fragments";
const STYLES_FILE: &str = "styles.xml";

/// A fragment/style store persisted as JSON files in a directory.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open a store rooted at `root`. The directory need not exist yet.
    pub fn open<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn fragment_path(&self, id: &str) -> PathBuf {
        self.root.join(FRAGMENTS_DIR).join(format!("{id}.json"))
    }

    /// Persist a harvest into the store. Returns the number of records
    /// written.
    pub fn save(&self, harvest: &Harvest) -> Result<usize> {
        let fragments_dir = self.root.join(FRAGMENTS_DIR);
        fs::create_dir_all(&fragments_dir)?;

        for record in &harvest.fragments {
            let json = serde_json::to_string_pretty(record)
                .map_err(|e| Error::Store(format!("serializing {}: {e}", record.id)))?;
            fs::write(self.fragment_path(&record.id), json)?;
        }

        if let Some(styles_xml) = &harvest.styles_xml {
            fs::write(self.root.join(STYLES_FILE), styles_xml)?;
        }

        Ok(harvest.fragments.len())
    }

    /// Load every stored record, sorted by id.
    pub fn load_all(&self) -> Result<Vec<FragmentRecord>> {
        let fragments_dir = self.root.join(FRAGMENTS_DIR);
        if !fragments_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&fragments_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = fs::read_to_string(&path)?;
            let record: FragmentRecord = serde_json::from_str(&json)
                .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?;
            records.push(record);
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn load_one(&self, id: &str) -> Result<Option<FragmentRecord>> {
        let path = self.fragment_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        let record = serde_json::from_str(&json)
            .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?;
        Ok(Some(record))
    }

    fn load_catalog(&self) -> Result<Option<StyleCatalog>> {
        let path = self.root.join(STYLES_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let styles_xml = fs::read_to_string(&path)?;
        match StyleCatalog::parse(&styles_xml) {
            Ok(catalog) => Ok(Some(catalog)),
            Err(e) => {
                log::warn!("stored style catalog did not parse: {e}");
                Ok(None)
            }
        }
    }
}

impl FragmentStore for DirStore {
    fn fetch(&self, ids: &[String]) -> Result<Vec<Option<FragmentRecord>>> {
        ids.iter().map(|id| self.load_one(id)).collect()
    }
}

impl StyleStore for DirStore {
    fn catalog_for(&self, _fragment_id: &str) -> Result<Option<StyleCatalog>> {
        // One shared catalog per store directory.
        self.load_catalog()
    }
}
