//! Pure transformation of the backend menu tree into a route tree. No
//! network access happens here; the menu fetch is the guard's concern.

use crate::router::registry::ViewRegistry;
use crate::router::{MenuNode, MenuNodeType, RouteComponent, RouteMeta, RouteNode};

/// Outcome of resolving one view identifier, with the candidate paths that
/// were tried (kept for diagnosability when resolution falls back).
#[derive(Debug, Clone)]
pub struct Resolution {
    pub component: RouteComponent,
    pub attempted: Vec<String>,
}

/// Resolve a declared view identifier against the registry. Resolution
/// order: exact path, `path/index`, hyphen-flattened path, last segment
/// alone. Never fails; an unresolvable identifier degrades to the not-found
/// view.
pub fn resolve_view_component(registry: &ViewRegistry, component_path: &str) -> Resolution {
    let normalized = component_path
        .trim()
        .trim_start_matches('/')
        .replace('\\', "/");

    if normalized.is_empty() {
        tracing::warn!("empty view identifier, falling back to not-found view");
        return Resolution {
            component: RouteComponent::NotFound,
            attempted: Vec::new(),
        };
    }

    let mut candidates = vec![normalized.clone(), format!("{normalized}/index")];
    if normalized.contains('/') {
        candidates.push(normalized.replace('/', "-"));
        if let Some(last) = normalized.rsplit('/').next() {
            candidates.push(last.to_string());
        }
    }

    for candidate in &candidates {
        if let Some(handle) = registry.lookup(candidate) {
            return Resolution {
                component: RouteComponent::View(handle),
                attempted: candidates.clone(),
            };
        }
    }

    tracing::warn!(
        identifier = component_path,
        attempted = ?candidates,
        "view not found, falling back to not-found view"
    );
    Resolution {
        component: RouteComponent::NotFound,
        attempted: candidates,
    }
}

/// Transform backend menu nodes into route nodes.
///
/// Containers resolve to the fixed layout shell, but only at the top level:
/// a nested container loses its component and becomes a pure grouping node,
/// since only real leaves and top-level shells render content. Children
/// recurse with `is_top_level = false`.
pub fn transform_routes(
    nodes: &[MenuNode],
    is_top_level: bool,
    registry: &ViewRegistry,
) -> Vec<RouteNode> {
    nodes
        .iter()
        .map(|node| {
            let is_container = node.node_type == MenuNodeType::Container;

            let component = if is_container {
                if is_top_level {
                    Some(RouteComponent::Layout)
                } else {
                    None
                }
            } else {
                let identifier = node.routing_address.as_deref().unwrap_or_default();
                Some(resolve_view_component(registry, identifier).component)
            };

            let children = if node.children.is_empty() {
                Vec::new()
            } else {
                transform_routes(&node.children, false, registry)
            };

            RouteNode {
                path: node.routing_address.clone().unwrap_or_default(),
                name: node.menu_code.clone(),
                component,
                meta: RouteMeta {
                    title: node.menu_name.clone(),
                    icon: node.icon.clone(),
                    hidden: node.show_values.as_deref() == Some("hide"),
                    keep_alive: false,
                },
                children,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct RouteValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

/// Walk a generated route tree and collect structural issues. Validation
/// only flags; invalid routes are still installed and degrade at render
/// time rather than aborting materialization.
pub fn validate_routes(routes: &[RouteNode]) -> RouteValidation {
    let mut issues = Vec::new();
    for route in routes {
        validate_route(route, "", &mut issues);
    }
    RouteValidation {
        is_valid: issues.is_empty(),
        issues,
    }
}

fn validate_route(route: &RouteNode, prefix: &str, issues: &mut Vec<String>) {
    if route.path.is_empty() {
        issues.push(format!("route at {prefix} missing path"));
    }

    if !route.path.is_empty() && !route.path.starts_with('/') && !prefix.is_empty() {
        issues.push(format!("route {prefix}{} should start with '/'", route.path));
    }

    if route.component.is_none() && route.children.is_empty() {
        issues.push(format!(
            "route {prefix}{} has no component and no children",
            route.path
        ));
    }

    for child in &route.children {
        validate_route(child, &format!("{prefix}{}/", route.path), issues);
    }
}
