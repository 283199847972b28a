//! Registration dialogue driven by chat updates.
//!
//! `/start` greets known users and invites unknown ones; the `register` callback opens a
//! two-step dialogue (full name, then birth date) that ends with a new participant.

mod state;
mod update;

pub use state::{ChatKey, ConversationStore, DialogueLock, DialogueState, RegistrationDraft};
pub use update::{
    send_message_body, BotError, BotReply, BotUpdate, ReplyButton, TelegramUpdate, UpdateKind,
};

use chrono::NaiveDate;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

use crate::application::repository::{Repository, UserRepository};
use crate::domain::context::OpContext;
use crate::domain::entities::User;
use crate::domain::errors::RepositoryError;

pub const REGISTER_CALLBACK: &str = "register";

const DATABASE_ERROR: &str = "Ошибка базы данных. Попробуйте позже.";
const USERNAME_REQUIRED: &str =
    "Для регистрации нужен username в Telegram. Укажите его в настройках и нажмите /start";
const ALREADY_REGISTERED: &str = "Вы уже зарегистрированы! Нажмите /start чтобы открыть личный кабинет";
const ASK_NAME: &str = "Как вас зовут? (ФИО)";
const INVALID_NAME: &str = "Некорректное ФИО! Пример ФИО: Иванов Иван Иванович\n\
                            Если у вас нет отчества, введите фамилию и имя: Иванов Иван";
const ASK_BIRTHDATE: &str = "Введите вашу дату рождения в формате 31.12.2005";
const INVALID_BIRTHDATE: &str = "Некорректная дата рождения! Пример даты рождения: 31.12.2005";
const REGISTERED: &str = "Вы были успешно зарегистрированы! 🎉\nНажмите /start чтобы перезапустить бота";
const REGISTRATION_FAILED: &str =
    "Не удалось сохранить регистрацию. Попробуйте отправить дату рождения ещё раз.";
const CANCELLED: &str = "Регистрация отменена. Нажмите /start чтобы начать заново.";

/// Cyrillic surname and given name, optionally followed by a patronymic.
pub fn is_valid_full_name(text: &str) -> bool {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[А-ЯЁ][а-яё]+(\s+[А-ЯЁ][а-яё]+){1,2}$").expect("Invalid name regex")
    });
    re.is_match(text)
}

/// `dd.mm.yyyy` with a year in 1900..=2099 naming a real calendar day.
pub fn parse_birthdate(text: &str) -> Option<NaiveDate> {
    static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = DATE_REGEX.get_or_init(|| {
        Regex::new(r"^(0[1-9]|[12][0-9]|3[01])\.(0[1-9]|1[0-2])\.(19|20)\d{2}$")
            .expect("Invalid birthdate regex")
    });
    if !re.is_match(text) {
        return None;
    }
    NaiveDate::parse_from_str(text, "%d.%m.%Y").ok()
}

fn is_command(text: &str, command: &str) -> bool {
    let Some(rest) = text.trim().strip_prefix('/') else {
        return false;
    };
    let word = rest.split_whitespace().next().unwrap_or_default();
    let name = word.split('@').next().unwrap_or_default();
    name == command
}

pub struct RegistrationBot {
    users: UserRepository,
    dialogues: Arc<ConversationStore>,
    mini_app_url: Option<String>,
}

impl RegistrationBot {
    pub fn new(
        users: UserRepository,
        dialogues: Arc<ConversationStore>,
        mini_app_url: Option<String>,
    ) -> Self {
        Self {
            users,
            dialogues,
            mini_app_url,
        }
    }

    pub fn dialogues(&self) -> &Arc<ConversationStore> {
        &self.dialogues
    }

    /// Process one update. `None` means the update needs no answer.
    pub async fn handle(&self, ctx: &OpContext, update: &BotUpdate) -> Option<BotReply> {
        match &update.kind {
            UpdateKind::Text(text) if is_command(text, "start") => Some(self.start(ctx, update).await),
            UpdateKind::Text(text) if is_command(text, "cancel") => self.cancel(update).await,
            UpdateKind::Callback(data) if data == REGISTER_CALLBACK => {
                Some(self.register(ctx, update).await)
            }
            UpdateKind::Callback(data) => {
                warn!("Ignoring unknown callback {:?} from {}", data, update.sender);
                None
            }
            UpdateKind::Text(text) => self.answer(ctx, update, text.trim()).await,
        }
    }

    async fn start(&self, ctx: &OpContext, update: &BotUpdate) -> BotReply {
        let Some(username) = update.username.as_deref() else {
            return BotReply::new(update.chat_id, USERNAME_REQUIRED);
        };

        match self.users.get_by_username(ctx, username).await {
            Ok(user) => {
                let reply = BotReply::new(
                    update.chat_id,
                    format!("{}, добро пожаловать в личный кабинет!", user.name),
                );
                match &self.mini_app_url {
                    Some(url) => reply.with_button(ReplyButton::Url {
                        label: "Открыть мини-приложение".into(),
                        url: url.clone(),
                    }),
                    None => reply,
                }
            }
            Err(RepositoryError::NotFound(_)) => BotReply::new(
                update.chat_id,
                format!(
                    "Добро пожаловать, {}! Вы пока что не зарегистрированы на хакатон 😭 \
                     Пожалуйста, пройдите регистрацию по кнопке ниже",
                    update.first_name
                ),
            )
            .with_button(ReplyButton::Callback {
                label: "Зарегистрироваться на хакатон".into(),
                data: REGISTER_CALLBACK.into(),
            }),
            Err(e) => {
                error!("Failed to look up {} on /start: {}", username, e);
                metrics::counter!("hackhub_store_failures_total").increment(1);
                BotReply::new(update.chat_id, DATABASE_ERROR)
            }
        }
    }

    async fn register(&self, ctx: &OpContext, update: &BotUpdate) -> BotReply {
        let Some(username) = update.username.as_deref() else {
            return BotReply::new(update.chat_id, USERNAME_REQUIRED);
        };

        let mut dialogue = self.dialogues.lock(update.sender).await;
        match self.users.get_by_username(ctx, username).await {
            Ok(_) => {
                dialogue.reset();
                BotReply::new(update.chat_id, ALREADY_REGISTERED)
            }
            Err(RepositoryError::NotFound(_)) => {
                dialogue.transition(DialogueState::AwaitingName, RegistrationDraft::default());
                BotReply::new(update.chat_id, ASK_NAME)
            }
            Err(e) => {
                error!("Failed to check registration of {}: {}", username, e);
                metrics::counter!("hackhub_store_failures_total").increment(1);
                BotReply::new(update.chat_id, DATABASE_ERROR)
            }
        }
    }

    async fn cancel(&self, update: &BotUpdate) -> Option<BotReply> {
        let mut dialogue = self.dialogues.lock(update.sender).await;
        if dialogue.state() == DialogueState::None {
            return None;
        }
        dialogue.reset();
        Some(BotReply::new(update.chat_id, CANCELLED))
    }

    async fn answer(&self, ctx: &OpContext, update: &BotUpdate, text: &str) -> Option<BotReply> {
        let mut dialogue = self.dialogues.lock(update.sender).await;
        match dialogue.state() {
            DialogueState::None => None,
            DialogueState::AwaitingName => {
                if !is_valid_full_name(text) {
                    return Some(BotReply::new(update.chat_id, INVALID_NAME));
                }
                dialogue.transition(
                    DialogueState::AwaitingBirthdate,
                    RegistrationDraft {
                        name: Some(text.to_string()),
                    },
                );
                Some(BotReply::new(update.chat_id, ASK_BIRTHDATE))
            }
            DialogueState::AwaitingBirthdate => match parse_birthdate(text) {
                Some(birthdate) => Some(self.complete(ctx, update, &mut dialogue, birthdate).await),
                None => Some(BotReply::new(update.chat_id, INVALID_BIRTHDATE)),
            },
        }
    }

    /// Final step, run while the dialogue is still locked. On a store failure the
    /// dialogue stays at `AwaitingBirthdate` with its draft so the user can resend.
    async fn complete(
        &self,
        ctx: &OpContext,
        update: &BotUpdate,
        dialogue: &mut DialogueLock,
        birthdate: NaiveDate,
    ) -> BotReply {
        let Some(username) = update.username.clone() else {
            return BotReply::new(update.chat_id, USERNAME_REQUIRED);
        };
        let Some(name) = dialogue.draft().name.clone() else {
            dialogue.transition(DialogueState::AwaitingName, RegistrationDraft::default());
            return BotReply::new(update.chat_id, ASK_NAME);
        };

        match self.users.get_by_username(ctx, &username).await {
            Ok(_) => {
                dialogue.reset();
                return BotReply::new(update.chat_id, ALREADY_REGISTERED);
            }
            Err(RepositoryError::NotFound(_)) => {}
            Err(e) => return self.registration_failed(update, &username, e),
        }

        let user = User::participant(name, birthdate, username.clone(), update.chat_id);
        match self.users.create(ctx, &user).await {
            Ok(id) => {
                dialogue.reset();
                metrics::counter!("hackhub_bot_registrations_total", "outcome" => "created")
                    .increment(1);
                info!("Registered {} as user {}", username, id);
                BotReply::new(update.chat_id, REGISTERED)
            }
            Err(e) => self.registration_failed(update, &username, e),
        }
    }

    fn registration_failed(&self, update: &BotUpdate, username: &str, e: RepositoryError) -> BotReply {
        error!("Failed to register {}: {}", username, e);
        metrics::counter!("hackhub_bot_registrations_total", "outcome" => "failed").increment(1);
        BotReply::new(update.chat_id, REGISTRATION_FAILED)
    }
}
