//! In-process stores used by the test suite in place of Postgres.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{CreateUser, User, UserId},
        session::{Session, SessionStore},
    },
    cards::{
        repo::CardStore,
        repo_types::{Card, CardId, CardPatch, CardType, NewCard},
    },
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn create(&self, username: &str, password_hash: &str) -> anyhow::Result<CreateUser> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == username) {
            return Ok(CreateUser::UsernameTaken);
        }
        let user = User {
            id: users.len() as UserId + 1,
            username: username.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(CreateUser::Created(user))
    }
}

#[derive(Default)]
pub struct MemoryCardStore {
    inner: Mutex<Cards>,
}

#[derive(Default)]
struct Cards {
    next_id: CardId,
    rows: BTreeMap<CardId, Card>,
}

#[async_trait]
impl CardStore for MemoryCardStore {
    async fn create(&self, owner_id: UserId, card: &NewCard) -> anyhow::Result<Card> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let card = Card {
            id: inner.next_id,
            owner_id,
            name: card.name.clone(),
            card_type: card.card_type,
            rarity: card.rarity,
            attack: card.attack,
            defense: card.defense,
            health: card.health,
            mana: card.mana,
            description: card.description.clone(),
            image_url: card.image_url.clone(),
            abilities: card.abilities.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(card.id, card.clone());
        Ok(card)
    }

    async fn get(&self, id: CardId) -> anyhow::Result<Option<Card>> {
        Ok(self.inner.lock().unwrap().rows.get(&id).cloned())
    }

    async fn list_by_owner(
        &self,
        owner_id: UserId,
        card_type: Option<CardType>,
    ) -> anyhow::Result<Vec<Card>> {
        let inner = self.inner.lock().unwrap();
        let mut cards: Vec<Card> = inner
            .rows
            .values()
            .filter(|c| c.owner_id == owner_id)
            .filter(|c| card_type.map_or(true, |t| c.card_type == t))
            .cloned()
            .collect();
        cards.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(cards)
    }

    async fn update(&self, id: CardId, patch: &CardPatch) -> anyhow::Result<Option<Card>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(card) = inner.rows.get_mut(&id) else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc().max(card.updated_at + time::Duration::microseconds(1));
        card.apply(patch, now);
        Ok(Some(card.clone()))
    }

    async fn delete(&self, id: CardId) -> anyhow::Result<bool> {
        Ok(self.inner.lock().unwrap().rows.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn contains(&self, token_hash: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(token_hash)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &Session) -> anyhow::Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_active(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Session>> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .get(token_hash)
            .filter(|s| !s.is_expired(now))
            .cloned())
    }

    async fn delete(&self, token_hash: &str) -> anyhow::Result<bool> {
        Ok(self.sessions.lock().unwrap().remove(token_hash).is_some())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}
