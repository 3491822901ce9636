use async_trait::async_trait;
use dc_types::{internal_error, CockpitResult, ObjectId, StorageError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default number of entries returned per listing page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// One request against an object store paginator
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingRequest {
    pub container: String,
    pub prefix: String,
    /// Groups keys sharing the part of the key up to the delimiter into a common prefix
    pub delimiter: Option<String>,
    pub continuation_token: Option<String>,
}

impl ListingRequest {
    pub fn new(container: &str, prefix: &str) -> Self {
        Self {
            container: container.to_string(),
            prefix: prefix.to_string(),
            delimiter: None,
            continuation_token: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Option<&str>) -> Self {
        self.delimiter = delimiter.filter(|d| !d.is_empty()).map(str::to_string);
        self
    }
}

/// One page of listing results
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingPage {
    pub keys: Vec<String>,
    pub common_prefixes: Vec<String>,
    pub next_token: Option<String>,
}

/// Trait for object stores the cockpit can browse
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Get store name
    fn name(&self) -> &str;

    /// Scheme used when building object identifiers (`<scheme>://container/key`)
    fn scheme(&self) -> &str;

    /// List the containers (buckets) of this store
    async fn list_containers(&self) -> CockpitResult<Vec<String>>;

    /// Fetch one listing page
    async fn list_page(&self, request: &ListingRequest) -> CockpitResult<ListingPage>;

    /// Identifier of an object in this store
    fn object_id(&self, container: &str, key: &str) -> ObjectId {
        ObjectId::new(format!("{}://{}/{}", self.scheme(), container, key))
    }
}

/// List every object under `prefix`, draining the paginator.
///
/// Each page contributes its object keys (folder markers ending in `/` are
/// skipped) followed by its common prefixes.
pub async fn list_objects<S>(
    store: &S,
    container: &str,
    prefix: &str,
    delimiter: Option<&str>,
) -> CockpitResult<Vec<String>>
where
    S: ObjectStore + ?Sized,
{
    let mut request = ListingRequest::new(container, prefix).with_delimiter(delimiter);
    let mut objects = Vec::new();
    let mut seen_tokens = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = store.list_page(&request).await?;
        pages += 1;

        objects.extend(page.keys.into_iter().filter(|key| !key.ends_with('/')));
        objects.extend(page.common_prefixes);

        match page.next_token {
            None => break,
            Some(token) => {
                if !seen_tokens.insert(token.clone()) {
                    return Err(StorageError::InvalidContinuationToken { token }.into());
                }
                request.continuation_token = Some(token);
            }
        }
    }

    tracing::debug!(
        "Listed {} entries from {} ({}://{}/{}) in {} pages",
        objects.len(),
        store.name(),
        store.scheme(),
        container,
        prefix,
        pages
    );
    Ok(objects)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Key(String),
    Prefix(String),
}

/// Page through sorted `keys` the way an object store paginator does.
///
/// Continuation tokens are entry offsets; a page holds up to `page_size`
/// keys and common prefixes combined.
fn paginate<'a, I>(
    keys: I,
    request: &ListingRequest,
    page_size: usize,
) -> Result<ListingPage, StorageError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut entries: Vec<Entry> = Vec::new();
    for key in keys {
        let Some(rest) = key.strip_prefix(request.prefix.as_str()) else {
            continue;
        };
        let grouped = request
            .delimiter
            .as_deref()
            .and_then(|delimiter| rest.find(delimiter).map(|idx| idx + delimiter.len()));
        let entry = match grouped {
            Some(end) => Entry::Prefix(format!("{}{}", request.prefix, &rest[..end])),
            None => Entry::Key(key.clone()),
        };
        if entries.last() != Some(&entry) {
            entries.push(entry);
        }
    }

    let offset = match &request.continuation_token {
        None => 0,
        Some(token) => token
            .parse::<usize>()
            .ok()
            .filter(|offset| *offset <= entries.len())
            .ok_or_else(|| StorageError::InvalidContinuationToken {
                token: token.clone(),
            })?,
    };
    let end = (offset + page_size.max(1)).min(entries.len());

    let mut page = ListingPage::default();
    for entry in &entries[offset..end] {
        match entry {
            Entry::Key(key) => page.keys.push(key.clone()),
            Entry::Prefix(prefix) => page.common_prefixes.push(prefix.clone()),
        }
    }
    if end < entries.len() {
        page.next_token = Some(end.to_string());
    }
    Ok(page)
}

/// In-memory object store for tests and demos
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore {
    pub name: String,
    containers: BTreeMap<String, BTreeSet<String>>,
    page_size: usize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            name: "In-Memory Store".to_string(),
            containers: BTreeMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn create_container(&mut self, container: &str) {
        self.containers.entry(container.to_string()).or_default();
    }

    pub fn insert(&mut self, container: &str, key: &str) {
        self.containers
            .entry(container.to_string())
            .or_default()
            .insert(key.to_string());
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn scheme(&self) -> &str {
        "memory"
    }

    async fn list_containers(&self) -> CockpitResult<Vec<String>> {
        Ok(self.containers.keys().cloned().collect())
    }

    async fn list_page(&self, request: &ListingRequest) -> CockpitResult<ListingPage> {
        let keys = self.containers.get(&request.container).ok_or_else(|| {
            StorageError::ContainerNotFound {
                container: request.container.clone(),
            }
        })?;
        Ok(paginate(keys, request, self.page_size)?)
    }
}

/// Object store backed by a local directory.
///
/// Each subdirectory of `root` is a container; keys are `/`-joined paths of
/// the regular files below it. A container is walked once per drain: the first
/// page takes a snapshot of its keys and continuation pages are served from it.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    pub name: String,
    pub root: PathBuf,
    page_size: usize,
    snapshots: Arc<Mutex<HashMap<String, Arc<Vec<String>>>>>,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            name: "Local Directory Store".to_string(),
            root: root.as_ref().to_path_buf(),
            page_size: DEFAULT_PAGE_SIZE,
            snapshots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    async fn container_path(&self, container: &str) -> Result<PathBuf, StorageError> {
        let not_found = || StorageError::ContainerNotFound {
            container: container.to_string(),
        };
        if container.is_empty()
            || container.contains(['/', '\\'])
            || container == "."
            || container == ".."
        {
            return Err(not_found());
        }
        let path = self.root.join(container);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => Ok(path),
            _ => Err(not_found()),
        }
    }

    /// Keys of `container`, walked afresh at the start of a drain.
    async fn container_keys(&self, request: &ListingRequest) -> CockpitResult<Arc<Vec<String>>> {
        if request.continuation_token.is_some() {
            let cached = self.snapshots.lock().get(&request.container).cloned();
            if let Some(keys) = cached {
                return Ok(keys);
            }
        }

        let base = self.container_path(&request.container).await?;
        let keys = Self::collect_keys(&base)
            .await
            .map_err(|e| StorageError::ListingFailed {
                container: request.container.clone(),
                message: e.to_string(),
            })?;
        let keys = Arc::new(keys);
        self.snapshots
            .lock()
            .insert(request.container.clone(), Arc::clone(&keys));
        Ok(keys)
    }

    async fn collect_keys(base: &Path) -> CockpitResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![base.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let relative = path.strip_prefix(base).map_err(|e| {
                        internal_error!("{} escapes {}: {}", path.display(), base.display(), e)
                    })?;
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn scheme(&self) -> &str {
        "local"
    }

    async fn list_containers(&self) -> CockpitResult<Vec<String>> {
        let mut containers = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                containers.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        containers.sort();
        Ok(containers)
    }

    async fn list_page(&self, request: &ListingRequest) -> CockpitResult<ListingPage> {
        let keys = self.container_keys(request).await?;
        Ok(paginate(keys.iter(), request, self.page_size)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_types::CockpitError;

    fn sample_store(page_size: usize) -> InMemoryObjectStore {
        let mut store = InMemoryObjectStore::new().with_page_size(page_size);
        for key in [
            "genomes/chr1.fasta",
            "genomes/chr2.fasta",
            "lidar/",
            "lidar/tile_0.las",
            "lidar/tile_1.laz",
            "readme.csv",
        ] {
            store.insert("open-data", key);
        }
        store.create_container("empty");
        store
    }

    #[tokio::test]
    async fn drains_all_pages_and_skips_folder_markers() {
        let store = sample_store(2);
        let objects = list_objects(&store, "open-data", "", None).await.unwrap();
        assert_eq!(
            objects,
            vec![
                "genomes/chr1.fasta",
                "genomes/chr2.fasta",
                "lidar/tile_0.las",
                "lidar/tile_1.laz",
                "readme.csv",
            ]
        );
    }

    #[tokio::test]
    async fn delimiter_groups_common_prefixes_after_keys_per_page() {
        let store = sample_store(10);
        let objects = list_objects(&store, "open-data", "", Some("/")).await.unwrap();
        assert_eq!(objects, vec!["readme.csv", "genomes/", "lidar/"]);

        let nested = list_objects(&store, "open-data", "lidar/", Some("/")).await.unwrap();
        assert_eq!(nested, vec!["lidar/tile_0.las", "lidar/tile_1.laz"]);
    }

    #[tokio::test]
    async fn single_page_has_no_token() {
        let store = sample_store(100);
        let page = store
            .list_page(&ListingRequest::new("open-data", "genomes/"))
            .await
            .unwrap();
        assert_eq!(page.keys.len(), 2);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn unknown_container_is_reported() {
        let store = sample_store(10);
        let err = list_objects(&store, "missing", "", None).await.unwrap_err();
        assert!(matches!(
            err,
            CockpitError::Storage(StorageError::ContainerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn bad_continuation_token_is_rejected() {
        let store = sample_store(10);
        let mut request = ListingRequest::new("open-data", "");
        request.continuation_token = Some("not-a-number".to_string());
        assert!(store.list_page(&request).await.is_err());
    }

    #[test]
    fn empty_container_lists_nothing() {
        let store = sample_store(10);
        let objects = tokio_test::block_on(list_objects(&store, "empty", "", None)).unwrap();
        assert!(objects.is_empty());
        let containers = tokio_test::block_on(store.list_containers()).unwrap();
        assert_eq!(containers, vec!["empty", "open-data"]);
    }

    #[test]
    fn object_ids_use_store_scheme() {
        let store = sample_store(10);
        assert_eq!(
            store.object_id("open-data", "readme.csv").as_str(),
            "memory://open-data/readme.csv"
        );
    }

    #[tokio::test]
    async fn local_store_lists_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = dir.path().join("bucket");
        std::fs::create_dir_all(bucket.join("vcf")).unwrap();
        std::fs::create_dir_all(bucket.join("empty_dir")).unwrap();
        std::fs::write(bucket.join("vcf").join("sample.vcf"), b"##fileformat=VCFv4.2").unwrap();
        std::fs::write(bucket.join("table.csv"), b"a,b\n1,2\n").unwrap();

        let store = LocalObjectStore::new(dir.path()).with_page_size(1);
        assert_eq!(store.list_containers().await.unwrap(), vec!["bucket"]);

        let objects = list_objects(&store, "bucket", "", None).await.unwrap();
        assert_eq!(objects, vec!["table.csv", "vcf/sample.vcf"]);

        let grouped = list_objects(&store, "bucket", "", Some("/")).await.unwrap();
        assert_eq!(grouped, vec!["table.csv", "vcf/"]);
    }

    /// Store whose paginator hands out `a`, `b`, `a`, ... forever.
    #[derive(Debug, Default)]
    struct CyclingStore {
        pages: Mutex<usize>,
    }

    #[async_trait]
    impl ObjectStore for CyclingStore {
        fn name(&self) -> &str {
            "Cycling Store"
        }

        fn scheme(&self) -> &str {
            "cycle"
        }

        async fn list_containers(&self) -> CockpitResult<Vec<String>> {
            Ok(vec!["loop".to_string()])
        }

        async fn list_page(&self, _request: &ListingRequest) -> CockpitResult<ListingPage> {
            let mut pages = self.pages.lock();
            *pages += 1;
            let token = if *pages % 2 == 1 { "a" } else { "b" };
            Ok(ListingPage {
                keys: vec![format!("key-{}", *pages)],
                common_prefixes: Vec::new(),
                next_token: Some(token.to_string()),
            })
        }
    }

    #[tokio::test]
    async fn cycling_continuation_tokens_end_the_drain() {
        let store = CyclingStore::default();
        let err = list_objects(&store, "loop", "", None).await.unwrap_err();
        match err {
            CockpitError::Storage(StorageError::InvalidContinuationToken { token }) => {
                assert_eq!(token, "a")
            }
            other => panic!("Expected InvalidContinuationToken, got {other:?}"),
        }
        assert_eq!(*store.pages.lock(), 3);
    }

    #[tokio::test]
    async fn local_store_serves_continuation_pages_from_one_walk() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = dir.path().join("bucket");
        std::fs::create_dir_all(&bucket).unwrap();
        std::fs::write(bucket.join("a.csv"), b"a").unwrap();
        std::fs::write(bucket.join("b.csv"), b"b").unwrap();

        let store = LocalObjectStore::new(dir.path()).with_page_size(1);
        let first = store.list_page(&ListingRequest::new("bucket", "")).await.unwrap();
        assert_eq!(first.keys, vec!["a.csv"]);

        std::fs::write(bucket.join("0.csv"), b"0").unwrap();
        let mut request = ListingRequest::new("bucket", "");
        request.continuation_token = first.next_token;
        let second = store.list_page(&request).await.unwrap();
        assert_eq!(second.keys, vec!["b.csv"]);
        assert!(second.next_token.is_none());

        let fresh = list_objects(&store, "bucket", "", None).await.unwrap();
        assert_eq!(fresh, vec!["0.csv", "a.csv", "b.csv"]);
    }

    #[tokio::test]
    async fn local_store_rejects_path_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        for container in ["..", "a/b", ""] {
            let err = list_objects(&store, container, "", None).await.unwrap_err();
            assert!(matches!(
                err,
                CockpitError::Storage(StorageError::ContainerNotFound { .. })
            ));
        }
    }
}
