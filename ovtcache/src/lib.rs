//! Cache TTL générique en mémoire pour OVTForm
//!
//! Ce crate fournit un cache clé → valeur dont les entrées expirent d'elles-mêmes
//! un délai fixe après leur écriture, indépendamment des lectures:
//! - Écriture avec éviction différée (`store`)
//! - Lecture non bloquante, sans rafraîchissement (`get`)
//! - Éviction supplémentaire planifiée sans toucher à la valeur (`release`)
//!
//! # Architecture
//!
//! L'éviction est une tâche différée idempotente (`tokio::spawn` + `sleep`):
//! aucune comptabilité d'annulation de timers n'existe. Chaque écriture porte
//! un numéro de génération; une éviction qui se déclenche sur une entrée déjà
//! supprimée ou réécrite depuis est un no-op inoffensif.

pub mod cache;

pub use cache::TtlCache;
