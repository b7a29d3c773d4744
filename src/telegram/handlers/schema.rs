//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{handle_broadcast_source, handle_command, handle_gate_check};
use super::types::{identity_of, HandlerDeps, HandlerError};
use crate::registry::UserRegistry;
use crate::storage::users::UserIdentity;
use crate::telegram::bot::Command;
use crate::telegram::gate::GATE_CHECK_CALLBACK;
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Every update first passes through the user registry; updates whose sender
/// cannot be recorded are dropped. Then, in order:
/// - commands (end-user and admin)
/// - the source message of an armed broadcast
/// - the gate's "I've joined" callback
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let registry = deps.registry.clone();

    dptree::entry()
        .filter_async(move |upd: Update| {
            let registry = registry.clone();
            async move { observe_sender(&registry, &upd).await }
        })
        .branch(command_handler(deps.clone()))
        .branch(broadcast_source_handler(deps.clone()))
        .branch(gate_check_handler(deps))
}

/// Records the sender of `upd`. Updates without a sender pass through.
async fn observe_sender(registry: &UserRegistry, upd: &Update) -> bool {
    admit_sender(registry, upd.from().map(identity_of), upd.id.0).await
}

/// `false` drops the update: its sender could not be recorded.
async fn admit_sender(registry: &UserRegistry, sender: Option<UserIdentity>, update_id: u32) -> bool {
    let Some(identity) = sender else {
        return true;
    };
    let user_id = identity.user_id;

    match registry.observe(identity).await {
        Ok(_) => true,
        Err(e) => {
            log::error!("Dropping update {} from {}: user store unavailable: {}", update_id, user_id, e);
            false
        }
    }
}

/// Handler for bot commands (/start, /broadcast_copy, /channel_add, etc.)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                handle_command(&bot, &msg, cmd, &deps).await
            }
        })
}

/// The first message after `/broadcast_*` from the arming admin
fn broadcast_source_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let broadcasts = deps.broadcasts.clone();

    Update::filter_message()
        .filter(move |msg: Message| {
            msg.from
                .as_ref()
                .map(|user| broadcasts.is_armed(identity_of(user).user_id))
                .unwrap_or(false)
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_broadcast_source(&bot, &msg, &deps).await }
        })
}

/// Re-runs the membership gate when the user presses "I've joined"
fn gate_check_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query()
        .filter(|q: CallbackQuery| q.data.as_deref() == Some(GATE_CHECK_CALLBACK))
        .endpoint(move |bot: Bot, q: CallbackQuery| {
            let deps = deps.clone();
            async move { handle_gate_check(&bot, &q, &deps).await }
        })
}
