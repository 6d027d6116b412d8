use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::auth::TracingRedirect;
use crate::config;
use crate::console::Console;
use crate::router::RouteNode;
use crate::router::registry::ViewRegistry;
use crate::types::LoginRequest;

#[derive(Parser)]
#[command(name = "console")]
#[command(about = "Admin console session and routing debugger")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Sign in and store the session token")]
    Login {
        #[arg(long)]
        job_number: String,

        #[arg(long)]
        password: String,

        #[arg(long, help = "Persist the token across restarts")]
        remember: bool,

        #[arg(long, help = "Tenant to sign into (multi-tenant accounts)")]
        tenant: Option<i64>,
    },

    #[command(about = "Materialize and print the menu-driven route table")]
    Routes,

    #[command(about = "Show the signed-in user profile")]
    Whoami,

    #[command(about = "Clear the stored session")]
    Logout,
}

fn build_console() -> anyhow::Result<Console> {
    // View keys normally come from build tooling; for the debugger they can
    // be supplied ad hoc so resolution can be exercised against real menus.
    let registry = match std::env::var("CONSOLE_VIEWS") {
        Ok(keys) => ViewRegistry::new(keys.split(',').map(str::trim)),
        Err(_) => ViewRegistry::default(),
    };

    let console = Console::new(
        config::config().clone(),
        registry,
        Arc::new(TracingRedirect),
    )?;
    Ok(console)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let console = build_console()?;

    match cli.command {
        Commands::Login {
            job_number,
            password,
            remember,
            tenant,
        } => {
            let request = LoginRequest {
                staff_job_number: job_number,
                staff_password: password,
                tenant_id: tenant,
                remember_me: remember,
                ..LoginRequest::default()
            };
            console.session.login(&request).await?;
            println!("signed in as {}", request.staff_job_number);
        }

        Commands::Routes => {
            console.guard.generate_routes().await?;
            let routes = console.guard.routes();
            if cli.json {
                let paths = collect_paths(&routes, "");
                println!("{}", serde_json::to_string_pretty(&paths)?);
            } else {
                for route in &routes {
                    print_route(route, 0);
                }
            }
            let issues = console.guard.validation_issues();
            if !issues.is_empty() {
                eprintln!("validation issues:");
                for issue in issues {
                    eprintln!("  - {issue}");
                }
            }
        }

        Commands::Whoami => {
            let info = console.session.get_user_info().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{} ({})", info.staff_name, info.staff_job_number);
                if !info.roles.is_empty() {
                    println!("roles: {}", info.roles.join(", "));
                }
            }
        }

        Commands::Logout => {
            console.session.logout().await?;
            console.guard.reset_routes();
            println!("signed out");
        }
    }

    Ok(())
}

fn print_route(route: &RouteNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let component = match &route.component {
        Some(component) => format!("{component:?}"),
        None => "(group)".to_string(),
    };
    println!("{indent}{} [{}] -> {component}", route.path, route.meta.title);
    for child in &route.children {
        print_route(child, depth + 1);
    }
}

fn collect_paths(routes: &[RouteNode], parent: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for route in routes {
        let full = if route.path.starts_with('/') || parent.is_empty() {
            route.path.clone()
        } else {
            format!("{}/{}", parent.trim_end_matches('/'), route.path)
        };
        paths.push(full.clone());
        paths.extend(collect_paths(&route.children, &full));
    }
    paths
}
