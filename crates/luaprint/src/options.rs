//! Rendering options.

/// How much of each function a listing shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Detail {
    /// Header and instructions only.
    #[default]
    Summary,
    /// Also the constants, locals and upvalues tables.
    Full,
}

/// Text format for number constants. Never affects fingerprints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NumberFormat {
    /// C `%f`: six decimals, e.g. `3.140000`.
    #[default]
    Fixed,
    /// Lua 5.1 `LUA_NUMBER_FMT` (`%.14g`), e.g. `3.14`.
    Lua,
}

/// Options for one rendering pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub detail: Detail,
    pub number_format: NumberFormat,
    /// Maximum function nesting depth; `None` for no limit.
    pub max_depth: Option<usize>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `detail(Detail::Full)`.
    pub fn full(self) -> Self {
        self.detail(Detail::Full)
    }

    pub fn detail(mut self, detail: Detail) -> Self {
        self.detail = detail;
        self
    }

    pub fn number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = format;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn is_full(&self) -> bool {
        self.detail == Detail::Full
    }
}
