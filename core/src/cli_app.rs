use crate::config::Config;
use crate::credential_store::CredentialStore;
use crate::gateway::{Gateway, HttpGateway};
use crate::models::{
    Avatar, Conversation, EntityId, PeerConversation, ProfileUpdate, Registration, Role, User,
};
use crate::session::{Outcome, Session};
use crate::store::{ChatStore, PeerChatStore, RecommendationStore};
use chrono::{DateTime, Local, Utc};
use colored::*;
use std::path::Path;

/// The conversation detail view is shared by both chat kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailMode {
    Assistant,
    Peer,
}

/// Commands that need a signed-in user
const PROTECTED: &[&str] = &[
    "me", "profile", "password", "chats", "chat", "new-chat", "ask", "people", "generate",
    "viewed", "dms", "dm", "dm-new", "dm-send", "read",
];

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let bin = args
        .first()
        .map(|s| s.as_str())
        .unwrap_or("gptinder")
        .to_string();

    let (config, command) = Config::from_args(&args)?;
    if command.is_empty() {
        print_usage(&bin);
        return Ok(());
    }

    let credentials = CredentialStore::new(&config.data_dir)?;
    let gateway = HttpGateway::new(&config, credentials.clone())?;
    let mut session = Session::new(gateway, credentials)?;

    let name = command[0].as_str();
    let rest = &command[1..];

    if PROTECTED.contains(&name) && !session.is_authenticated() {
        redirect_to_login(&bin);
    }

    match name {
        "login" => {
            let [username, password] = expect_args::<2>(rest, &bin, "login <username> <password>");
            let user = report(session.login(&username, &password).await);
            println!(
                "{} Logged in as {}",
                "✓".green().bold(),
                user.display_name().cyan()
            );
        }
        "logout" => {
            report(session.logout().await);
            println!("{} Logged out", "✓".green().bold());
        }
        "register" => {
            let [username, email, password, password_confirm] = expect_args::<4>(
                rest,
                &bin,
                "register <username> <email> <password> <password_confirm>",
            );
            let form = Registration {
                username,
                email,
                password,
                password_confirm,
                ..Default::default()
            };
            let user = report(session.register(form).await);
            println!(
                "{} Account {} created. Log in with: {} login {} <password>",
                "✓".green().bold(),
                user.username.cyan(),
                bin,
                user.username
            );
        }
        "me" => {
            let user = report(session.fetch_current_user().await);
            print_profile(&user);
        }
        "profile" => {
            let update = parse_profile_flags(rest, &bin)?;
            let user = report(session.update_profile(update).await);
            println!("{} Profile updated", "✓".green().bold());
            print_profile(&user);
        }
        "password" => {
            let [current, new, confirm] =
                expect_args::<3>(rest, &bin, "password <current> <new> <confirm>");
            report(session.update_password(&current, &new, &confirm).await);
            println!("{} Password updated", "✓".green().bold());
        }
        "chats" => {
            report(session.load_chats().await);
            print_chat_list(session.chats(), &bin);
        }
        "chat" => {
            let [id] = expect_args::<1>(rest, &bin, "chat <chat_id>");
            let chat = report(session.open_chat(parse_id(&id, &bin)).await);
            print_chat(session.chats(), &chat);
        }
        "new-chat" => {
            let title = rest.join(" ");
            let chat = report(session.create_chat(&title).await);
            println!(
                "{} Created chat {}",
                "✓".green().bold(),
                chat.id.to_string().cyan()
            );
        }
        "ask" => {
            let (id, text) = id_and_text(rest, &bin, "ask <chat_id> <message>");
            report(session.open_chat(id).await);
            let outcome = session.ask(id, &text).await;
            if let Some(chat) = session.chats().current() {
                print_chat(session.chats(), chat);
            }
            report(outcome);
        }
        "people" => {
            report(session.load_recommendations().await);
            print_recommendations(session.recommendations(), &bin);
        }
        "generate" => {
            report(session.generate_recommendations().await);
            print_recommendations(session.recommendations(), &bin);
        }
        "viewed" => {
            let [id] = expect_args::<1>(rest, &bin, "viewed <recommendation_id>");
            report(session.mark_recommendation_viewed(parse_id(&id, &bin)).await);
            println!("{} Marked as viewed", "✓".green().bold());
        }
        "dms" => {
            load_me(&mut session).await;
            report(session.load_peer_chats().await);
            print_peer_list(
                session.peer_chats(),
                session.identity().user().map(|u| u.id),
                &bin,
            );
        }
        "dm" => {
            let [id] = expect_args::<1>(rest, &bin, "dm <user_chat_id>");
            load_me(&mut session).await;
            let chat = report(session.open_peer_chat(parse_id(&id, &bin)).await);
            print_peer_chat(&session, &chat);
        }
        "dm-new" => {
            let [user_id] = expect_args::<1>(rest, &bin, "dm-new <user_id>");
            load_me(&mut session).await;
            // The list lets an existing conversation be reused
            report(session.load_peer_chats().await);
            let chat = report(session.start_peer_chat(parse_id(&user_id, &bin)).await);
            println!(
                "{} Conversation {} ready",
                "✓".green().bold(),
                chat.id.to_string().cyan()
            );
            print_peer_chat(&session, &chat);
        }
        "dm-send" => {
            let (id, text) = id_and_text(rest, &bin, "dm-send <user_chat_id> <message>");
            load_me(&mut session).await;
            report(session.open_peer_chat(id).await);
            let outcome = session.send_peer_message(id, &text).await;
            if let Some(chat) = session.peer_chats().current() {
                print_peer_chat(&session, chat);
            }
            report(outcome);
        }
        "read" => {
            let [id] = expect_args::<1>(rest, &bin, "read <user_chat_id>");
            report(session.mark_peer_chat_read(parse_id(&id, &bin)).await);
            println!("{} Marked as read", "✓".green().bold());
        }
        other => {
            eprintln!("{} Unknown command: {}", "✗".red().bold(), other.red());
            print_usage(&bin);
        }
    }

    Ok(())
}

fn print_usage(bin: &str) {
    println!("{}", "💬 GPTinder".bright_cyan().bold());
    println!();
    println!("{}", "Usage:".bright_white().bold());
    println!(
        "  {} [--api-url <url>] [--data-dir <path>] [--timeout <secs>] <command> [args]",
        bin.cyan()
    );
    println!();
    println!("{}", "Account:".bright_white().bold());
    println!("  {} <username> <password>          Sign in", "login".cyan());
    println!("  {}                               Sign out", "logout".cyan());
    println!(
        "  {} <user> <email> <pw> <confirm> Create an account",
        "register".cyan()
    );
    println!("  {}                                   Show your profile", "me".cyan());
    println!(
        "  {} [--bio ..] [--interests ..] [--avatar <file>] ...  Edit profile",
        "profile".cyan()
    );
    println!(
        "  {} <current> <new> <confirm>   Change password",
        "password".cyan()
    );
    println!();
    println!("{}", "AI chat:".bright_white().bold());
    println!("  {}                                List chats", "chats".cyan());
    println!("  {} <id>                            Show a chat", "chat".cyan());
    println!("  {} [title]                     Start a chat", "new-chat".cyan());
    println!("  {} <id> <message>                   Ask the assistant", "ask".cyan());
    println!();
    println!("{}", "People:".bright_white().bold());
    println!("  {}                               Recommended people", "people".cyan());
    println!("  {}                             Recompute recommendations", "generate".cyan());
    println!("  {} <id>                          Mark a recommendation viewed", "viewed".cyan());
    println!("  {}                                  List conversations", "dms".cyan());
    println!("  {} <id>                              Open a conversation", "dm".cyan());
    println!("  {} <user_id>                     Message a person", "dm-new".cyan());
    println!("  {} <id> <message>               Send a message", "dm-send".cyan());
    println!("  {} <id>                            Mark a conversation read", "read".cyan());
}

fn redirect_to_login(bin: &str) -> ! {
    eprintln!("{}", "✗ You are not logged in".red().bold());
    eprintln!("  {} {}", "-".dimmed(), format!("{} login <username> <password>", bin).yellow());
    std::process::exit(1);
}

/// Unwrap an outcome or print the error and exit.
fn report<T>(outcome: Outcome<T>) -> T {
    match outcome {
        Outcome::Done(value) => value,
        Outcome::Failed(error) => {
            eprintln!("{} Error: {}", "✗".red().bold(), error.red());
            std::process::exit(1);
        }
    }
}

fn usage_error(bin: &str, usage: &str) -> ! {
    eprintln!("{}", format!("Usage: {} {}", bin, usage).yellow());
    std::process::exit(2);
}

fn expect_args<const N: usize>(rest: &[String], bin: &str, usage: &str) -> [String; N] {
    match <[String; N]>::try_from(rest.to_vec()) {
        Ok(args) => args,
        Err(_) => usage_error(bin, usage),
    }
}

fn id_and_text(rest: &[String], bin: &str, usage: &str) -> (EntityId, String) {
    if rest.len() < 2 {
        usage_error(bin, usage);
    }
    (parse_id(&rest[0], bin), rest[1..].join(" "))
}

fn parse_id(raw: &str, bin: &str) -> EntityId {
    match raw.parse::<EntityId>() {
        Ok(id) if id > 0 => id,
        _ => {
            eprintln!("{} Not a valid id: {}", "✗".red().bold(), raw.red());
            usage_error(bin, "<command> <id> ...");
        }
    }
}

fn parse_profile_flags(rest: &[String], bin: &str) -> anyhow::Result<ProfileUpdate> {
    let mut update = ProfileUpdate::default();
    let mut i = 0;
    while i < rest.len() {
        let Some(value) = rest.get(i + 1).cloned() else {
            usage_error(bin, "profile --<field> <value> ...");
        };
        match rest[i].as_str() {
            "--username" => update.username = Some(value),
            "--email" => update.email = Some(value),
            "--first-name" => update.first_name = Some(value),
            "--last-name" => update.last_name = Some(value),
            "--bio" => update.bio = Some(value),
            "--interests" => update.interests = Some(value),
            "--avatar" => {
                let path = Path::new(&value);
                let bytes = std::fs::read(path)
                    .map_err(|e| anyhow::anyhow!("Cannot read avatar {}: {}", value, e))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "avatar".to_string());
                update.avatar = Some(Avatar { file_name, bytes });
            }
            other => {
                eprintln!("{} Unknown profile field: {}", "✗".red().bold(), other.red());
                usage_error(bin, "profile --<field> <value> ...");
            }
        }
        i += 2;
    }
    Ok(update)
}

/// Best effort: the peer views need to know who "me" is.
async fn load_me<G: Gateway>(session: &mut Session<G>) {
    if session.identity().user().is_none() {
        if let Outcome::Failed(msg) = session.fetch_current_user().await {
            tracing::warn!("Could not load current user: {}", msg);
        }
    }
}

fn when(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %d %H:%M").to_string()
}

fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max {
        format!("{}…", line.chars().take(max).collect::<String>())
    } else {
        line.to_string()
    }
}

// ─── Views ───────────────────────────────────────────────────────────────────

fn print_profile(user: &User) {
    println!(
        "{}",
        "╭─ Profile ─────────────────────────────────────────────────────╮".bright_cyan()
    );
    let rows = [
        ("Username", user.username.clone()),
        ("Name", user.display_name()),
        ("Email", user.email.clone()),
        ("Bio", user.bio.clone()),
        ("Interests", user.interests.clone()),
        (
            "Picture",
            user.profile_picture.clone().unwrap_or_else(|| "-".to_string()),
        ),
    ];
    for (label, value) in rows {
        println!(
            "{} {}",
            "│".bright_cyan(),
            format!("{:<10} {}", format!("{}:", label), value.cyan()).bright_white()
        );
    }
    println!(
        "{}",
        "╰───────────────────────────────────────────────────────────────╯".bright_cyan()
    );
}

fn print_chat_list(store: &ChatStore, bin: &str) {
    if store.items().is_empty() {
        println!("{}", "No chats yet".yellow());
        println!("  {} {}", "-".dimmed(), format!("{} new-chat", bin).yellow());
        return;
    }
    println!(
        "{}",
        format!("AI Chats ({})", store.items().len()).bright_cyan().bold()
    );
    println!("{}", "─".repeat(60).dimmed());
    for chat in store.items() {
        let title = if chat.title.is_empty() {
            format!("Chat {}", chat.id)
        } else {
            chat.title.clone()
        };
        let last = chat
            .messages
            .last()
            .map(|m| preview(&m.content, 40))
            .unwrap_or_default();
        println!(
            "  {:>4}  {}  {}  {}",
            chat.id.to_string().cyan(),
            title.bright_white(),
            when(&chat.updated_at).dimmed(),
            last.dimmed()
        );
    }
}

fn print_peer_list(store: &PeerChatStore, me: Option<EntityId>, bin: &str) {
    if store.items().is_empty() {
        println!("{}", "No conversations yet".yellow());
        println!("  {} {}", "-".dimmed(), format!("{} people", bin).yellow());
        return;
    }
    println!(
        "{}",
        format!("Conversations ({})", store.items().len())
            .bright_cyan()
            .bold()
    );
    println!("{}", "─".repeat(60).dimmed());
    for chat in store.items() {
        let name = chat
            .counterpart(me)
            .map(|u| u.display_name())
            .unwrap_or_else(|| "?".to_string());
        let unread = chat.unread_count(me);
        let badge = if unread > 0 {
            format!("({} new)", unread).green().bold()
        } else {
            "".normal()
        };
        let last = chat
            .last_message
            .as_ref()
            .map(|m| preview(&m.content, 40))
            .unwrap_or_default();
        println!(
            "  {:>4}  {} {}  {}  {}",
            chat.id.to_string().cyan(),
            name.bright_white(),
            badge,
            when(&chat.updated_at).dimmed(),
            last.dimmed()
        );
    }
}

fn print_recommendations(store: &RecommendationStore, bin: &str) {
    if store.items().is_empty() {
        println!("{}", "No recommendations yet".yellow());
        println!("  {} {}", "-".dimmed(), format!("{} generate", bin).yellow());
        return;
    }
    println!(
        "{}",
        format!("Recommended People ({})", store.items().len())
            .bright_cyan()
            .bold()
    );
    println!("{}", "─".repeat(60).dimmed());
    for rec in store.items() {
        let marker = if rec.is_viewed { " ".normal() } else { "•".green().bold() };
        println!(
            "{} {:>4}  {} (user {})  {}",
            marker,
            rec.id.to_string().cyan(),
            rec.recommended_user.display_name().bright_white(),
            rec.recommended_user.id,
            format!("{:.0}% match", rec.similarity_score * 100.0).green()
        );
        if !rec.common_interests.is_empty() {
            println!("        {}", rec.common_interests.join(", ").dimmed());
        }
        if let Some(explanation) = &rec.explanation {
            println!("        {}", preview(explanation, 70).italic());
        }
    }
}

struct DetailLine<'a> {
    author: String,
    own: bool,
    content: &'a str,
    at: DateTime<Utc>,
    pending: bool,
}

fn print_detail(mode: DetailMode, title: &str, lines: &[DetailLine]) {
    let header = match mode {
        DetailMode::Assistant => format!("🤖 {}", title),
        DetailMode::Peer => format!("💬 {}", title),
    };
    println!("{}", header.bright_cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
    if lines.is_empty() {
        println!("{}", "No messages yet".dimmed());
    }
    for line in lines {
        let author = if line.own {
            line.author.green().bold()
        } else {
            line.author.cyan().bold()
        };
        let status = if line.pending { " (sending…)".yellow() } else { "".normal() };
        println!("{} {}{}", author, when(&line.at).dimmed(), status);
        for text in line.content.lines() {
            println!("  {}", text);
        }
    }
}

fn print_chat(store: &ChatStore, chat: &Conversation) {
    let title = if chat.title.is_empty() {
        format!("Chat {}", chat.id)
    } else {
        chat.title.clone()
    };
    let lines: Vec<DetailLine> = chat
        .messages
        .iter()
        .map(|m| DetailLine {
            author: match m.role {
                Role::User => "You".to_string(),
                Role::Assistant => "Assistant".to_string(),
                Role::System => "System".to_string(),
            },
            own: m.role == Role::User,
            content: &m.content,
            at: m.created_at,
            pending: store.is_pending(m.id),
        })
        .collect();
    print_detail(DetailMode::Assistant, &title, &lines);
}

fn print_peer_chat<G: Gateway>(session: &Session<G>, chat: &PeerConversation) {
    let me = session.identity().user().map(|u| u.id);
    let title = chat
        .counterpart(me)
        .map(|u| u.display_name())
        .unwrap_or_else(|| format!("Conversation {}", chat.id));
    let lines: Vec<DetailLine> = chat
        .messages
        .iter()
        .map(|m| DetailLine {
            author: if Some(m.sender) == me {
                "You".to_string()
            } else {
                m.sender_username.clone()
            },
            own: Some(m.sender) == me,
            content: &m.content,
            at: m.created_at,
            pending: session.peer_chats().is_pending(m.id),
        })
        .collect();
    print_detail(DetailMode::Peer, &title, &lines);
}
