//! Command definitions and execution
//!
//! Results are written to `out` as pretty-printed JSON.

use std::io::Write;

use clap::{Args, Subcommand};
use idbridge::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::{CliError, CliResult};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify a principal's credentials
    Authenticate(AuthenticateArgs),

    /// Look up a principal by login name
    Principal(PrincipalArgs),

    /// Look up a group by name
    Group(GroupArgs),

    /// Look up a principal by identifier
    Id(IdArgs),

    /// Page through principals matching a search term
    Search(SearchArgs),
}

#[derive(Debug, Args)]
pub struct AuthenticateArgs {
    /// Login name, with or without domain
    pub principal: String,

    /// Password
    #[arg(long, env = "IDBRIDGE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct PrincipalArgs {
    pub login: String,
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    pub name: String,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    /// GUID in its textual form
    pub id: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Text contained in the login, principal name or display name
    #[arg(default_value = "")]
    pub query: String,

    /// Restrict results to members of the group mapped to this role
    #[arg(long)]
    pub role: Option<String>,

    /// Principals per page
    #[arg(long, default_value_t = 50)]
    pub page_size: u32,

    /// Stop after this many pages
    #[arg(long)]
    pub max_pages: Option<u32>,
}

#[derive(Serialize)]
struct AuthenticateOutput<'a> {
    principal: &'a str,
    authenticated: bool,
}

#[derive(Serialize)]
struct SearchOutput {
    items: Vec<PrincipalSummary>,
    pages: u32,
    /// Whether every page was fetched.
    complete: bool,
}

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn found<T>(value: Option<T>, what: String) -> CliResult<T> {
    value.ok_or(CliError::NotFound(what))
}

/// Run one command against `bridge`.
pub async fn execute<B: IdentityBridge>(
    bridge: &B,
    command: Command,
    out: &mut impl Write,
) -> CliResult<()> {
    match command {
        Command::Authenticate(args) => {
            bridge.authenticate(&args.principal, &args.password).await?;
            print_json(
                out,
                &AuthenticateOutput {
                    principal: &args.principal,
                    authenticated: true,
                },
            )
        }
        Command::Principal(args) => {
            let principal = bridge.search_principal::<Principal>(&args.login).await?;
            print_json(out, &found(principal, format!("principal '{}'", args.login))?)
        }
        Command::Group(args) => {
            let group = bridge.search_group::<Group>(&args.name).await?;
            print_json(out, &found(group, format!("group '{}'", args.name))?)
        }
        Command::Id(args) => {
            let principal = bridge.search_by_id::<Principal>(&args.id).await?;
            print_json(out, &found(principal, format!("principal with id '{}'", args.id))?)
        }
        Command::Search(args) => {
            let output = search(bridge, &args).await?;
            print_json(out, &output)
        }
    }
}

async fn search<B: IdentityBridge>(bridge: &B, args: &SearchArgs) -> CliResult<SearchOutput> {
    let mut items = Vec::new();
    let mut pages = 0;
    let mut token: Option<SessionToken> = None;

    let complete = loop {
        let result = bridge
            .search_principals_paginated::<PrincipalSummary>(
                &args.query,
                args.role.as_deref(),
                args.page_size,
                token.as_ref().map(SessionToken::as_str),
            )
            .await;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                if let Some(token) = &token {
                    bridge.end_session(token.as_str()).await;
                }
                return Err(e.into());
            }
        };

        pages += 1;
        items.extend(page.items);
        token = Some(page.session_token);

        if !page.has_more {
            break true;
        }
        if args.max_pages.is_some_and(|max| pages >= max) {
            break false;
        }
    };

    if let Some(token) = &token {
        bridge.end_session(token.as_str()).await;
    }

    info!(pages, results = items.len(), complete, "Search finished");
    Ok(SearchOutput {
        items,
        pages,
        complete,
    })
}
