#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Source {
    Literal,
    File(String),
}

#[derive(Debug, Clone)]
pub struct Input {
    pub source: Source,
    pub content: String,
}
