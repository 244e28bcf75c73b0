/// One page of typed search results, along with what is needed to fetch the
/// next one.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPage<T> {
    documents: Vec<T>,
    query: String,
    total: u64,
    from: usize,
    size: usize,
}

impl<T> IndexPage<T> {
    pub fn new(documents: Vec<T>, query: impl Into<String>, total: u64, from: usize, size: usize) -> Self {
        Self {
            documents,
            query: query.into(),
            total,
            from,
            size,
        }
    }

    pub fn documents(&self) -> &[T] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<T> {
        self.documents
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of hits matching the query across all pages.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_last_page(&self) -> bool {
        (self.from + self.size) as u64 >= self.total
    }

    pub fn next_from(&self) -> usize {
        self.from + self.size
    }
}
