//! The built-in `admin` module.
//!
//! - `<nick>: reload [name|*]` rebuilds one module, or every module when
//!   the name is `*` or omitted. Admins only; everyone else is ignored.
//! - `.help [handler]` shows a handler's documentation, or lists the
//!   documented handlers.

use crate::context::Invocation;
use crate::error::{Grumble, ModuleError};
use crate::handler::{HandlerResult, HandlerSpec, Priority};
use crate::module::{Module, ModuleDescriptor};
use crate::rule::RuleSpec;

/// Name the admin module registers under.
pub const ADMIN_MODULE: &str = "admin";

/// Descriptor for the built-in admin module.
pub fn admin_module() -> ModuleDescriptor {
    ModuleDescriptor::new(ADMIN_MODULE, || {
        Module::new()
            .handler(
                HandlerSpec::new("reload", reload)
                    .rule(RuleSpec::prefixed_commands("$nick", ["reload"], r"(\S+)?"))
                    .priority(Priority::Low)
                    .inline()
                    .doc("Reloads a module, or every module with '*'. Admins only.")
                    .example("$nickname: reload ping"),
            )
            .handler(
                HandlerSpec::new("help", help)
                    .commands(["help"])
                    .doc("Shows the documentation of a command.")
                    .example(".help ping"),
            )
    })
}

async fn reload(inv: Invocation) -> HandlerResult {
    if !inv.is_admin() {
        return Ok(());
    }
    let manager = inv.bot().modules().ok_or(ModuleError::Unavailable)?;

    let name = inv.group(2).map(str::trim).unwrap_or_default();
    if name.is_empty() || name == "*" {
        let report = manager.reload_all().await;
        if report.failed.is_empty() {
            inv.reply("done").await?;
        } else {
            inv.reply(format!("done, but failed: {}", report.failed.join(", ")))
                .await?;
        }
        return Ok(());
    }

    if inv.settings().is_owner(name) {
        inv.reply("What?").await?;
        return Ok(());
    }

    match manager.reload(name).await {
        Ok(generation) => {
            inv.reply(format!("{name} reloaded (generation {generation})"))
                .await?;
        }
        Err(e @ ModuleError::Unknown(_)) => return Err(Grumble::new(e.to_string()).into()),
        Err(e) => inv.reply(e.to_string()).await?,
    }
    Ok(())
}

async fn help(inv: Invocation) -> HandlerResult {
    let manager = inv.bot().modules().ok_or(ModuleError::Unavailable)?;

    match inv.group(2).map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => {
            let Some(doc) = manager.doc(name) else {
                return Err(Grumble::new(format!("No documentation for {name}.")).into());
            };
            inv.reply(&doc.doc).await?;
            if let Some(example) = &doc.example {
                inv.say(format!("e.g. {example}")).await?;
            }
        }
        None => {
            let names: Vec<String> = manager.docs().into_keys().collect();
            if names.is_empty() {
                inv.reply("No documented commands.").await?;
            } else {
                inv.reply(format!("Commands: {}", names.join(", "))).await?;
            }
        }
    }
    Ok(())
}
