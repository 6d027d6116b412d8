//! Backend menu tree to client route table: types, the view registry, the
//! pure materialization transform, and the per-navigation guard.

pub mod guard;
pub mod materializer;
pub mod registry;

use serde::{Deserialize, Serialize};

use registry::ViewHandle;

/// Hierarchical menu node as delivered by the SSO menu endpoint. Read-only
/// input to materialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuNode {
    pub menu_code: String,
    pub menu_name: String,
    #[serde(default)]
    pub routing_address: Option<String>,
    #[serde(rename = "type", default)]
    pub node_type: MenuNodeType,
    #[serde(default)]
    pub icon: Option<String>,
    /// Visibility flag from the menu editor; `"hide"` keeps the route out of
    /// rendered navigation without removing it from the table.
    #[serde(default)]
    pub show_values: Option<String>,
    #[serde(default)]
    pub children: Vec<MenuNode>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuNodeType {
    /// Groups children under the layout shell; renders nothing of its own.
    Container,
    #[default]
    Leaf,
}

/// One installed client-side route. Shared read-mostly with the routing
/// runtime once installed.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteNode {
    pub path: String,
    pub name: String,
    pub component: Option<RouteComponent>,
    pub meta: RouteMeta,
    pub children: Vec<RouteNode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteMeta {
    pub title: String,
    pub icon: Option<String>,
    pub hidden: bool,
    pub keep_alive: bool,
}

/// What a route renders. Container nodes resolve to the fixed layout shell;
/// leaves resolve through the view registry, falling back to the not-found
/// view when nothing matches.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteComponent {
    Layout,
    View(ViewHandle),
    NotFound,
}
