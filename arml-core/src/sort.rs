use std::fmt;

pub const DEFAULT_SORT_FIELD: &str = "id";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }

    pub fn parse(s: &str) -> Option<SortOrder> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Some(SortOrder::Ascending),
            "desc" => Some(SortOrder::Descending),
            _ => None,
        }
    }

    pub fn reversed(&self) -> SortOrder {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortIndicator {
    Unsorted,
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortState {
    pub field: String,
    pub order: SortOrder,
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(DEFAULT_SORT_FIELD, SortOrder::Ascending)
    }
}

impl SortState {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    /// Parses a `<field>,<dir>` value. A missing or unknown direction means
    /// ascending; an empty field is rejected.
    pub fn parse(value: &str) -> Option<SortState> {
        let mut parts = value.splitn(2, ',');
        let field = parts.next()?.trim();
        if field.is_empty() {
            return None;
        }
        let order = parts
            .next()
            .and_then(SortOrder::parse)
            .unwrap_or_default();
        Some(SortState::new(field, order))
    }

    /// Reads the `sort` parameter of a query string (with or without the
    /// leading `?`), falling back to `default_field` ascending.
    pub fn from_query(query: &str, default_field: &str) -> SortState {
        query
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(key, _)| *key == "sort")
            .find_map(|(_, value)| SortState::parse(value))
            .unwrap_or_else(|| SortState::new(default_field, SortOrder::Ascending))
    }

    /// Value of the backend `sort` query parameter.
    pub fn param(&self) -> String {
        format!("{},{}", self.field, self.order.as_str())
    }

    /// Query string for the list location, including the leading `?`.
    pub fn to_query(&self) -> String {
        format!("?sort={}", self.param())
    }

    /// Header click: flips the direction on the active column, otherwise
    /// switches to the clicked column ascending.
    pub fn toggle(&self, field: &str) -> SortState {
        if self.field == field {
            SortState::new(field, self.order.reversed())
        } else {
            SortState::new(field, SortOrder::Ascending)
        }
    }

    pub fn indicator(&self, field: &str) -> SortIndicator {
        if self.field != field {
            return SortIndicator::Unsorted;
        }
        match self.order {
            SortOrder::Ascending => SortIndicator::Ascending,
            SortOrder::Descending => SortIndicator::Descending,
        }
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.param())
    }
}
