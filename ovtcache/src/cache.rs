//! Module de gestion du cache TTL générique
//!
//! Ce module fournit un cache en mémoire clé → valeur avec éviction différée.
//! Les valeurs sont mémoïsées à l'écriture et disparaissent après leur TTL;
//! une lecture ne prolonge jamais la vie d'une entrée.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::trace;

/// Entrée du cache: la valeur et la génération de l'écriture qui l'a posée
struct Entry<V> {
    value: V,
    generation: u64,
}

/// Cache TTL générique en mémoire
///
/// Chaque `store` planifie une éviction différée après le TTL fourni.
/// L'éviction est idempotente: la tâche capture la génération de l'écriture
/// et ne supprime l'entrée que si cette génération est toujours en place.
/// Une entrée réécrite entre-temps n'est donc jamais supprimée par une
/// éviction périmée, sans aucune annulation de timer.
///
/// Aucune garantie de single-flight: deux lecteurs qui constatent un miss
/// simultanément déclencheront chacun leur propre fetch amont. Ce coût borné
/// est accepté.
///
/// Note : Ce type est conçu pour être utilisé derrière un `Arc` et nécessite
/// un runtime tokio actif (les évictions sont des tâches `tokio::spawn`).
pub struct TtlCache<K, V> {
    /// Entrées vivantes (clé -> valeur + génération)
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
    /// Compteur de générations, incrémenté à chaque écriture
    generation: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Crée un cache vide
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Écrit une valeur et planifie son éviction après `ttl`
    ///
    /// L'écriture est inconditionnelle: une valeur déjà présente est
    /// remplacée et sa génération avance, ce qui neutralise les évictions
    /// planifiées par les écritures précédentes.
    pub async fn store(&self, key: K, value: V, ttl: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut entries = self.entries.write().await;
            entries.insert(key.clone(), Entry { value, generation });
        }
        self.schedule_eviction(key, generation, ttl);
    }

    /// Lit la valeur courante, sans effet sur son TTL
    ///
    /// Lecture non bloquante au sens du cache: aucun fetch, aucun
    /// rafraîchissement, aucune éviction déclenchée.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Planifie une éviction supplémentaire après `ttl`, sans toucher à la valeur
    ///
    /// Sert à borner la vie restante d'une entrée après une rafale de
    /// lectures. Si la clé est absente, il n'y a rien à évincer et l'appel
    /// est un no-op. Une réécriture postérieure à l'appel est protégée par
    /// sa nouvelle génération.
    pub async fn release(&self, key: &K, ttl: Duration) {
        let generation = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) => entry.generation,
                None => return,
            }
        };
        self.schedule_eviction(key.clone(), generation, ttl);
    }

    /// Nombre d'entrées vivantes
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Vrai si le cache est vide
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Lance la tâche d'éviction différée pour (clé, génération)
    fn schedule_eviction(&self, key: K, generation: u64, ttl: Duration) {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut entries = entries.write().await;
            match entries.get(&key) {
                Some(entry) if entry.generation == generation => {
                    trace!("evicting cache entry {:?} (generation {})", key, generation);
                    entries.remove(&key);
                }
                // Entrée réécrite ou déjà supprimée: éviction périmée, no-op
                _ => trace!("stale eviction for {:?} ignored", key),
            }
        });
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
