/**
 * COLLECTION - Stockage de documents JSON avec cache mémoire
 *
 * RÔLE :
 * Une collection = un fichier `<nom>.json` (tableau de documents) + un cache
 * en mémoire protégé par un mutex. Sans répertoire, la collection vit
 * uniquement en mémoire (tests, démo).
 *
 * FONCTIONNEMENT :
 * - Lecture : toujours depuis le cache
 * - Écriture : le nouvel état est d'abord écrit sur disque (fichier temporaire
 *   + rename), puis seulement appliqué au cache. Une écriture qui échoue
 *   laisse la collection inchangée.
 * - `modify_one` : lecture-modification-écriture atomique sous le verrou de
 *   la collection, la closure peut refuser la modification
 */

use parking_lot::Mutex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Document, StoreError};

pub struct Collection<T: Document> {
    /// `None` : collection purement en mémoire
    storage_path: Option<PathBuf>,
    cache: Mutex<Vec<T>>,
}

impl<T: Document> Collection<T> {
    pub fn in_memory() -> Self {
        Self { storage_path: None, cache: Mutex::new(Vec::new()) }
    }

    /// Ouvre `<dir>/<COLLECTION>.json`, créé vide s'il n'existe pas
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let collection = Self {
            storage_path: Some(dir.join(format!("{}.json", T::COLLECTION))),
            cache: Mutex::new(Vec::new()),
        };
        collection.load_from_disk()?;
        Ok(collection)
    }

    fn load_from_disk(&self) -> Result<(), StoreError> {
        let Some(path) = &self.storage_path else {
            return Ok(());
        };
        if !path.exists() {
            fs::write(path, "[]")?;
        }
        let content = fs::read_to_string(path)?;
        let docs: Vec<T> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content)?
        };
        tracing::info!("[store] {} loaded ({} documents)", T::COLLECTION, docs.len());
        *self.cache.lock() = docs;
        Ok(())
    }

    fn persist<S: Serialize + ?Sized>(&self, docs: &S) -> Result<(), StoreError> {
        let Some(path) = &self.storage_path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(docs)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn find(&self, filter: impl Fn(&T) -> bool) -> Vec<T> {
        self.cache.lock().iter().filter(|doc| filter(doc)).cloned().collect()
    }

    pub fn find_one(&self, filter: impl Fn(&T) -> bool) -> Option<T> {
        self.cache.lock().iter().find(|doc| filter(doc)).cloned()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.find_one(|doc| doc.id() == id)
    }

    pub fn count(&self, filter: impl Fn(&T) -> bool) -> usize {
        self.cache.lock().iter().filter(|doc| filter(doc)).count()
    }

    pub fn all(&self) -> Vec<T> {
        self.cache.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Upsert par identifiant
    pub fn save(&self, doc: T) -> Result<(), StoreError> {
        let mut cache = self.cache.lock();
        match cache.iter().position(|d| d.id() == doc.id()) {
            Some(index) => {
                self.persist(&replaced(&cache, index, &doc))?;
                cache[index] = doc;
            }
            None => {
                self.persist(&appended(&cache, &doc))?;
                cache.push(doc);
            }
        }
        Ok(())
    }

    /// Insère `doc` sauf si un document existant entre en conflit avec lui
    pub fn insert_unique(
        &self,
        doc: T,
        conflicts: impl Fn(&T) -> bool,
        what: &str,
    ) -> Result<(), StoreError> {
        let mut cache = self.cache.lock();
        if cache.iter().any(|d| d.id() == doc.id() || conflicts(d)) {
            return Err(StoreError::Duplicate(what.to_string()));
        }
        self.persist(&appended(&cache, &doc))?;
        cache.push(doc);
        Ok(())
    }

    /// Modifie le premier document qui correspond au filtre.
    /// `Ok(None)` si aucun document ne correspond. Si la closure échoue,
    /// rien n'est écrit.
    pub fn modify_one<R, E>(
        &self,
        filter: impl Fn(&T) -> bool,
        modify: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<Option<R>, E>
    where
        E: From<StoreError>,
    {
        self.modify_one_then(filter, modify, |_| Ok(()))
    }

    /// Comme `modify_one`, puis `then` une fois le document écrit sur disque,
    /// toujours sous le verrou de la collection. Si `then` échoue, le fichier
    /// reprend son contenu précédent et le cache n'est pas modifié.
    pub fn modify_one_then<R, E>(
        &self,
        filter: impl Fn(&T) -> bool,
        modify: impl FnOnce(&mut T) -> Result<R, E>,
        then: impl FnOnce(&R) -> Result<(), E>,
    ) -> Result<Option<R>, E>
    where
        E: From<StoreError>,
    {
        let mut cache = self.cache.lock();
        let Some(index) = cache.iter().position(|doc| filter(doc)) else {
            return Ok(None);
        };
        let mut doc = cache[index].clone();
        let result = modify(&mut doc)?;
        self.persist(&replaced(&cache, index, &doc))?;
        if let Err(err) = then(&result) {
            if let Err(rollback) = self.persist(&*cache) {
                tracing::error!("[store] {} rollback failed: {rollback}", T::COLLECTION);
            }
            return Err(err);
        }
        cache[index] = doc;
        Ok(Some(result))
    }

    /// Applique `modify` à tous les documents filtrés, retourne leur nombre
    pub fn update_many(
        &self,
        filter: impl Fn(&T) -> bool,
        modify: impl Fn(&mut T),
    ) -> Result<usize, StoreError> {
        let mut cache = self.cache.lock();
        let mut next = cache.clone();
        let mut touched = 0;
        for doc in next.iter_mut().filter(|doc| filter(doc)) {
            modify(doc);
            touched += 1;
        }
        if touched > 0 {
            self.persist(&next)?;
            *cache = next;
        }
        Ok(touched)
    }

    /// Retire les documents filtrés et les retourne
    pub fn remove(&self, filter: impl Fn(&T) -> bool) -> Result<Vec<T>, StoreError> {
        let mut cache = self.cache.lock();
        let (removed, kept): (Vec<T>, Vec<T>) = cache.iter().cloned().partition(|doc| filter(doc));
        if !removed.is_empty() {
            self.persist(&kept)?;
            *cache = kept;
        }
        Ok(removed)
    }
}

fn replaced<'a, T>(docs: &'a [T], index: usize, doc: &'a T) -> Vec<&'a T> {
    docs.iter()
        .enumerate()
        .map(|(i, d)| if i == index { doc } else { d })
        .collect()
}

fn appended<'a, T>(docs: &'a [T], doc: &'a T) -> Vec<&'a T> {
    docs.iter().chain(std::iter::once(doc)).collect()
}
