//! Subcommand handlers

use crate::{Command, ConfigAction, StashAction};
use anyhow::{bail, Result};
use cloudsave_core::{ChangeStatus, ChangedFile, CloudSaves, Save, SaveStatus};
use cloudsave_foundation::{ConfigUpdate, SafeConfig};
use serde::Serialize;

pub async fn run(saves: &CloudSaves, command: Command, json: bool) -> Result<()> {
    let out = Output { json };

    match command {
        Command::Config { action } => match action {
            ConfigAction::Show => out.emit(&saves.config()?, print_config),
            ConfigAction::Set {
                repo_url,
                token,
                display_name,
                branch,
                auto_save,
                interval,
                target,
            } => {
                let update = ConfigUpdate {
                    repo_url,
                    github_token: token,
                    display_name,
                    branch,
                    is_authorized: None,
                    auto_save_enabled: auto_save,
                    auto_save_interval: interval,
                    auto_save_target_tag: target,
                };
                out.emit(&saves.update_config(update).await?, print_config)
            }
        },

        Command::Authorize { branch } => {
            let config = saves.authorize(branch.as_deref()).await?;
            out.emit(&config, |c| {
                println!("✓ Connected to {} on branch {}", c.repo_url, c.branch);
                if let Some(user) = &c.username {
                    println!("  GitHub user: {}", user);
                }
            })
        }

        Command::Init { force } => {
            if force {
                let outcome = saves.reinitialize().await?;
                out.emit(&outcome, |o| {
                    println!("✓ Repository re-initialized");
                    if let Some(w) = &o.remote_warning {
                        println!("⚠ Remote not configured: {}", w);
                    }
                })
            } else {
                if saves.status().await?.initialized {
                    bail!("repository already initialized; use --force to start over");
                }
                let config = saves.authorize(None).await?;
                out.emit(&config, |c| {
                    println!("✓ Initialized and connected on branch {}", c.branch)
                })
            }
        }

        Command::List => out.emit(&saves.list_saves().await?, |list| print_saves(list)),

        Command::Create { name, description } => {
            let save = saves.create_save(&name, description.as_deref()).await?;
            out.emit(&save, |s| println!("✓ Created {} ({})", s.name, s.tag))
        }

        Command::Load { tag } => {
            let outcome = saves.load_save(&tag).await?;
            out.emit(&outcome, |o| {
                println!("✓ Loaded {}", tag);
                if o.stash_created {
                    println!("  Local changes were stashed; see `cloudsave stash apply`");
                }
            })
        }

        Command::Delete { tag } => {
            let outcome = saves.delete_save(&tag).await?;
            out.emit(&outcome, |o| {
                println!("✓ Deleted {}", tag);
                if let Some(w) = &o.warning {
                    println!("⚠ {}", w);
                }
            })
        }

        Command::Rename {
            tag,
            name,
            description,
        } => {
            let outcome = saves
                .rename_save(&tag, &name, description.as_deref())
                .await?;
            out.emit(&outcome, |o| {
                if o.old_tag == o.new_tag {
                    println!("✓ Updated {}", o.new_tag);
                } else {
                    println!("✓ Renamed {} -> {}", o.old_tag, o.new_tag);
                }
            })
        }

        Command::Overwrite { tag } => {
            let outcome = saves.overwrite_save(&tag).await?;
            out.emit(&outcome, |o| {
                let note = if o.committed { "" } else { " (no changes)" };
                println!("✓ Overwrote {} at {}{}", o.tag, short(&o.commit), note)
            })
        }

        Command::Diff { from, to } => {
            out.emit(&saves.save_diff(&from, &to).await?, |files| {
                print_diff(files)
            })
        }

        Command::Status => out.emit(&saves.status().await?, print_status),

        Command::Stash { action } => match action {
            StashAction::Check => out.emit(&saves.check_temp_stash().await?, |c| {
                if c.exists {
                    println!("Temporary stash pending");
                } else {
                    println!("No temporary stash");
                }
                if let Some(e) = &c.error {
                    println!("⚠ {}", e);
                }
            }),
            StashAction::Apply => {
                let outcome = saves.apply_temp_stash().await?;
                out.emit(&outcome, |o| {
                    println!("✓ Stash applied");
                    if let Some(w) = &o.warning {
                        println!("⚠ {}", w);
                    }
                })
            }
            StashAction::Discard => {
                saves.discard_temp_stash().await?;
                out.emit(&serde_json::json!({ "discarded": true }), |_| {
                    println!("✓ Stash discarded")
                })
            }
        },

        Command::Autosave => run_autosave(saves).await,
    }
}

/// 자동 저장 타이머를 Ctrl-C까지 실행
async fn run_autosave(saves: &CloudSaves) -> Result<()> {
    let Some(period) = saves.start_auto_save().await else {
        bail!("auto-save is not armed; authorize, enable it and set a target tag first");
    };
    println!(
        "Auto-saving every {} seconds. Press Ctrl-C to stop.",
        period.as_secs()
    );

    tokio::signal::ctrl_c().await?;
    saves.stop_auto_save().await;
    println!("Auto-save stopped");
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

fn print_config(c: &SafeConfig) {
    println!("Repository:  {}", or_dash(&c.repo_url));
    println!("Branch:      {}", c.branch);
    println!("Authorized:  {}", c.is_authorized);
    println!("Token:       {}", if c.has_github_token { "set" } else { "-" });
    if let Some(user) = &c.username {
        println!("GitHub user: {}", user);
    }
    if !c.display_name.is_empty() {
        println!("Name:        {}", c.display_name);
    }
    println!(
        "Auto-save:   {} every {} min -> {}",
        if c.auto_save_enabled { "on" } else { "off" },
        c.auto_save_interval,
        or_dash(&c.auto_save_target_tag)
    );
}

fn print_saves(saves: &[Save]) {
    if saves.is_empty() {
        println!("No saves yet");
        return;
    }
    for s in saves {
        println!(
            "{}  {:<24} {}",
            s.updated_at.format("%Y-%m-%d %H:%M"),
            s.name,
            s.tag
        );
        if !s.description.is_empty() {
            println!("    {}", s.description.lines().next().unwrap_or_default());
        }
    }
}

fn print_diff(files: &[ChangedFile]) {
    if files.is_empty() {
        println!("No differences");
    }
    for f in files {
        match &f.previous_path {
            Some(prev) => println!("{} {} -> {}", status_letter(f.status), prev, f.path),
            None => println!("{} {}", status_letter(f.status), f.path),
        }
    }
}

fn print_status(s: &SaveStatus) {
    if !s.initialized {
        println!("Not initialized; run `cloudsave authorize`");
        return;
    }
    match (&s.current_branch, s.is_detached) {
        (Some(branch), _) => println!("On branch {} (+{} -{})", branch, s.ahead, s.behind),
        (None, true) => println!("Detached HEAD"),
        (None, false) => println!("No commits yet"),
    }
    if let Some(current) = &s.current_save {
        println!(
            "Loaded save {} at {}",
            current.tag,
            current.loaded_at.format("%Y-%m-%d %H:%M")
        );
    }
    if s.temp_stash {
        println!("Temporary stash pending");
    }
    if s.changes.is_empty() {
        println!("Working tree clean");
    } else {
        println!("{} changed:", s.changes.len());
        for line in &s.changes {
            println!("  {}", line);
        }
    }
}

fn status_letter(status: ChangeStatus) -> char {
    match status {
        ChangeStatus::Added => 'A',
        ChangeStatus::Modified => 'M',
        ChangeStatus::Deleted => 'D',
        ChangeStatus::Renamed => 'R',
        ChangeStatus::Copied => 'C',
        ChangeStatus::TypeChanged => 'T',
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn short(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}
