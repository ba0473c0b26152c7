use std::fmt;

use thiserror::Error;

use crate::{EntityId, EntityKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("no route for path: {0}")]
    NoMatch(String),
}

/// A navigable URL split into its path and query (the query keeps its `?`).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Location {
    pub path: String,
    pub query: String,
}

impl Location {
    pub fn parse(url: &str) -> Location {
        match url.find('?') {
            Some(index) => Location {
                path: url[..index].to_string(),
                query: url[index..].to_string(),
            },
            None => Location {
                path: url.to_string(),
                query: String::new(),
            },
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.path, self.query)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteAction {
    List,
    New,
    Detail(EntityId),
    Edit(EntityId),
    Delete(EntityId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub kind: EntityKind,
    pub action: RouteAction,
}

impl Route {
    pub fn new(kind: EntityKind, action: RouteAction) -> Self {
        Self { kind, action }
    }

    pub fn list(kind: EntityKind) -> Self {
        Self::new(kind, RouteAction::List)
    }

    /// Parses `/<entity-kind>[/new | /:id[/edit | /delete]]`. The query
    /// string, if any, is ignored.
    pub fn parse(path: &str) -> Result<Route, RouteError> {
        let location = Location::parse(path);
        let segments: Vec<&str> = location
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let Some((first, rest)) = segments.split_first() else {
            return Err(RouteError::NoMatch(path.to_string()));
        };
        let kind = EntityKind::from_route_segment(first)
            .ok_or_else(|| RouteError::UnknownEntity(first.to_string()))?;
        let action = match rest {
            [] => RouteAction::List,
            ["new"] => RouteAction::New,
            [id] => RouteAction::Detail(parse_id(id)?),
            [id, "edit"] => RouteAction::Edit(parse_id(id)?),
            [id, "delete"] => RouteAction::Delete(parse_id(id)?),
            _ => return Err(RouteError::NoMatch(path.to_string())),
        };
        Ok(Route { kind, action })
    }

    pub fn id(&self) -> Option<EntityId> {
        match self.action {
            RouteAction::Detail(id) | RouteAction::Edit(id) | RouteAction::Delete(id) => Some(id),
            RouteAction::List | RouteAction::New => None,
        }
    }
}

fn parse_id(s: &str) -> Result<EntityId, RouteError> {
    s.parse()
        .map_err(|_| RouteError::InvalidId(s.to_string()))
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.kind.list_path();
        match self.action {
            RouteAction::List => write!(f, "{}", base),
            RouteAction::New => write!(f, "{}/new", base),
            RouteAction::Detail(id) => write!(f, "{}/{}", base, id),
            RouteAction::Edit(id) => write!(f, "{}/{}/edit", base, id),
            RouteAction::Delete(id) => write!(f, "{}/{}/delete", base, id),
        }
    }
}
