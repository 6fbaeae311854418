//! In-memory repositories and bucket used by the test suite. They follow the
//! Postgres schema rules: owner filtering, `(owner, name)` uniqueness and
//! `ON DELETE CASCADE`.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    attributes::{
        repo::AttributeRepo,
        repo_types::{Attribute, AttributeKind},
    },
    error::AppError,
    recipes::{
        repo::{dedup, RecipeRepo},
        repo_types::{NewRecipe, Recipe, RecipeChanges, RecipeFilter, RecipeRow},
    },
    storage::StorageClient,
    users::{
        repo::UserRepo,
        repo_types::{NewUser, User, UserChanges},
    },
};

#[derive(Debug, Clone)]
struct StoredAttribute {
    kind: AttributeKind,
    owner: Uuid,
    attribute: Attribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    kind: AttributeKind,
    recipe_id: i64,
    attribute_id: i64,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    recipes: Vec<RecipeRow>,
    attributes: Vec<StoredAttribute>,
    links: Vec<Link>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn hydrate(&self, row: &RecipeRow) -> Recipe {
        Recipe {
            tags: self.linked(AttributeKind::Tag, row.id),
            ingredients: self.linked(AttributeKind::Ingredient, row.id),
            row: row.clone(),
        }
    }

    fn linked(&self, kind: AttributeKind, recipe_id: i64) -> Vec<Attribute> {
        let ids: HashSet<i64> = self
            .links
            .iter()
            .filter(|l| l.kind == kind && l.recipe_id == recipe_id)
            .map(|l| l.attribute_id)
            .collect();
        let mut out: Vec<Attribute> = self
            .attributes
            .iter()
            .filter(|a| a.kind == kind && ids.contains(&a.attribute.id))
            .map(|a| a.attribute.clone())
            .collect();
        out.sort_by_key(|a| a.id);
        out
    }

    fn upsert(&mut self, kind: AttributeKind, owner: Uuid, name: &str) -> i64 {
        if let Some(existing) = self
            .attributes
            .iter()
            .find(|a| a.kind == kind && a.owner == owner && a.attribute.name == name)
        {
            return existing.attribute.id;
        }
        let id = self.next_id();
        self.attributes.push(StoredAttribute {
            kind,
            owner,
            attribute: Attribute {
                id,
                name: name.to_string(),
            },
        });
        id
    }

    fn relink(&mut self, kind: AttributeKind, owner: Uuid, recipe_id: i64, names: &[String]) {
        self.links.retain(|l| !(l.kind == kind && l.recipe_id == recipe_id));
        for name in dedup(names) {
            let attribute_id = self.upsert(kind, owner, name);
            self.links.push(Link {
                kind,
                recipe_id,
                attribute_id,
            });
        }
    }

    fn owned_recipe(&mut self, owner: Uuid, id: i64) -> Option<&mut RecipeRow> {
        self.recipes
            .iter_mut()
            .find(|r| r.id == id && r.user_id == owner)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store poisoned")
    }

    pub fn has_user(&self, email: &str) -> bool {
        self.lock().users.iter().any(|u| u.email == email)
    }

    pub fn recipe_count(&self) -> usize {
        self.lock().recipes.len()
    }

    pub fn attribute_count(&self, kind: AttributeKind) -> usize {
        self.lock().attributes.iter().filter(|a| a.kind == kind).count()
    }

    pub fn link_count(&self) -> usize {
        self.lock().links.len()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert(&self, new: NewUser) -> Result<User, AppError> {
        let mut inner = self.lock();
        if inner.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::Conflict("email"));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            is_active: new.is_active,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let mut inner = self.lock();
        if let Some(email) = &changes.email {
            if inner.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::Conflict("email"));
            }
        }
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(staff) = changes.is_staff {
            user.is_staff = staff;
        }
        if let Some(superuser) = changes.is_superuser {
            user.is_superuser = superuser;
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.lock();
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        if inner.users.len() == before {
            return Ok(false);
        }
        let recipe_ids: HashSet<i64> = inner
            .recipes
            .iter()
            .filter(|r| r.user_id == id)
            .map(|r| r.id)
            .collect();
        let attribute_ids: HashSet<i64> = inner
            .attributes
            .iter()
            .filter(|a| a.owner == id)
            .map(|a| a.attribute.id)
            .collect();
        inner.recipes.retain(|r| r.user_id != id);
        inner.attributes.retain(|a| a.owner != id);
        inner
            .links
            .retain(|l| !recipe_ids.contains(&l.recipe_id) && !attribute_ids.contains(&l.attribute_id));
        Ok(true)
    }
}

#[async_trait]
impl RecipeRepo for MemoryStore {
    async fn list(&self, owner: Uuid, filter: &RecipeFilter) -> Result<Vec<Recipe>, AppError> {
        let inner = self.lock();
        let matches_any = |kind: AttributeKind, recipe_id: i64, wanted: &[i64]| {
            wanted.is_empty()
                || inner
                    .links
                    .iter()
                    .any(|l| l.kind == kind && l.recipe_id == recipe_id && wanted.contains(&l.attribute_id))
        };
        let mut rows: Vec<&RecipeRow> = inner
            .recipes
            .iter()
            .filter(|r| r.user_id == owner)
            .filter(|r| matches_any(AttributeKind::Tag, r.id, filter.tags.as_slice()))
            .filter(|r| matches_any(AttributeKind::Ingredient, r.id, filter.ingredients.as_slice()))
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows.into_iter().map(|r| inner.hydrate(r)).collect())
    }

    async fn get(&self, owner: Uuid, id: i64) -> Result<Option<Recipe>, AppError> {
        let inner = self.lock();
        Ok(inner
            .recipes
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
            .map(|r| inner.hydrate(r)))
    }

    async fn create(&self, owner: Uuid, new: NewRecipe) -> Result<Recipe, AppError> {
        let mut inner = self.lock();
        let id = inner.next_id();
        let row = RecipeRow {
            id,
            user_id: owner,
            title: new.title,
            description: new.description,
            time_minutes: new.time_minutes,
            price: new.price,
            link: new.link,
            image: None,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.recipes.push(row.clone());
        inner.relink(AttributeKind::Tag, owner, id, &new.tags);
        inner.relink(AttributeKind::Ingredient, owner, id, &new.ingredients);
        Ok(inner.hydrate(&row))
    }

    async fn update(&self, owner: Uuid, id: i64, changes: RecipeChanges) -> Result<Option<Recipe>, AppError> {
        let mut inner = self.lock();
        let Some(row) = inner.owned_recipe(owner, id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(minutes) = changes.time_minutes {
            row.time_minutes = minutes;
        }
        if let Some(price) = changes.price {
            row.price = price;
        }
        if let Some(link) = changes.link {
            row.link = link;
        }
        let row = row.clone();
        if let Some(tags) = &changes.tags {
            inner.relink(AttributeKind::Tag, owner, id, tags);
        }
        if let Some(ingredients) = &changes.ingredients {
            inner.relink(AttributeKind::Ingredient, owner, id, ingredients);
        }
        Ok(Some(inner.hydrate(&row)))
    }

    async fn delete(&self, owner: Uuid, id: i64) -> Result<Option<RecipeRow>, AppError> {
        let mut inner = self.lock();
        let Some(pos) = inner
            .recipes
            .iter()
            .position(|r| r.id == id && r.user_id == owner)
        else {
            return Ok(None);
        };
        let row = inner.recipes.remove(pos);
        inner.links.retain(|l| l.recipe_id != id);
        Ok(Some(row))
    }

    async fn set_image(&self, owner: Uuid, id: i64, key: &str) -> Result<Option<(Recipe, Option<String>)>, AppError> {
        let mut inner = self.lock();
        let Some(row) = inner.owned_recipe(owner, id) else {
            return Ok(None);
        };
        let previous = row.image.replace(key.to_string());
        let row = row.clone();
        Ok(Some((inner.hydrate(&row), previous)))
    }

    async fn image_keys(&self, owner: Uuid) -> Result<Vec<String>, AppError> {
        Ok(self
            .lock()
            .recipes
            .iter()
            .filter(|r| r.user_id == owner)
            .filter_map(|r| r.image.clone())
            .collect())
    }
}

#[async_trait]
impl AttributeRepo for MemoryStore {
    async fn list(&self, kind: AttributeKind, owner: Uuid, assigned_only: bool) -> Result<Vec<Attribute>, AppError> {
        let inner = self.lock();
        let mut out: Vec<Attribute> = inner
            .attributes
            .iter()
            .filter(|a| a.kind == kind && a.owner == owner)
            .filter(|a| {
                !assigned_only
                    || inner
                        .links
                        .iter()
                        .any(|l| l.kind == kind && l.attribute_id == a.attribute.id)
            })
            .map(|a| a.attribute.clone())
            .collect();
        out.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn get(&self, kind: AttributeKind, owner: Uuid, id: i64) -> Result<Option<Attribute>, AppError> {
        Ok(self
            .lock()
            .attributes
            .iter()
            .find(|a| a.kind == kind && a.owner == owner && a.attribute.id == id)
            .map(|a| a.attribute.clone()))
    }

    async fn rename(&self, kind: AttributeKind, owner: Uuid, id: i64, name: &str) -> Result<Option<Attribute>, AppError> {
        let mut inner = self.lock();
        if inner
            .attributes
            .iter()
            .any(|a| a.kind == kind && a.owner == owner && a.attribute.id != id && a.attribute.name == name)
        {
            return Err(AppError::Conflict("name"));
        }
        Ok(inner
            .attributes
            .iter_mut()
            .find(|a| a.kind == kind && a.owner == owner && a.attribute.id == id)
            .map(|a| {
                a.attribute.name = name.to_string();
                a.attribute.clone()
            }))
    }

    async fn delete(&self, kind: AttributeKind, owner: Uuid, id: i64) -> Result<bool, AppError> {
        let mut inner = self.lock();
        let before = inner.attributes.len();
        inner
            .attributes
            .retain(|a| !(a.kind == kind && a.owner == owner && a.attribute.id == id));
        if inner.attributes.len() == before {
            return Ok(false);
        }
        inner
            .links
            .retain(|l| !(l.kind == kind && l.attribute_id == id));
        Ok(true)
    }
}

/// Bucket double that keeps objects in a map.
#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
}

impl FakeStorage {
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().expect("fake storage poisoned").contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("fake storage poisoned").len()
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.objects
            .lock()
            .expect("fake storage poisoned")
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects.lock().expect("fake storage poisoned").remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
        Ok(format!("https://fake.local/{}?expires={}", key, seconds))
    }
}
