//! Assemblage du texte de réponse
//!
//! Ce module concatène les fragments ordonnés d'une réponse en un seul
//! texte. Chaque fragment est isolé: un paramètre inutilisable ou un miss du
//! fournisseur ne produit rien et la composition continue avec le fragment
//! suivant. Après le rendu, chaque compte touché par un fragment dynamique
//! reçoit un `release` à courte échéance pour qu'un second rendu proche
//! réutilise la valeur déjà récupérée.

use ovtstore::{ComponentKind, NowPlayingSource, Storage};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Fenêtre de grâce par défaut accordée après un rendu
pub const DEFAULT_RELEASE_GRACE: Duration = Duration::from_secs(5);

/// Joint des éléments avec un séparateur principal, le dernier couple étant
/// joint par un séparateur final
///
/// `[] → ""`, `["A"] → "A"`, `["A","B"] → "A & B"`,
/// `["A","B","C"] → "A, B & C"` avec les séparateurs `", "` et `" & "`.
pub fn linked_string(items: &[String], primary_separator: &str, last_separator: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{}{}{}", rest.join(primary_separator), last_separator, last),
    }
}

/// Compositeur de réponses
pub struct ResponseCompositor {
    store: Arc<dyn Storage>,
    now_playing: Arc<dyn NowPlayingSource>,
    release_grace: Duration,
}

impl ResponseCompositor {
    /// Crée un compositeur avec la fenêtre de grâce par défaut
    pub fn new(store: Arc<dyn Storage>, now_playing: Arc<dyn NowPlayingSource>) -> Self {
        Self {
            store,
            now_playing,
            release_grace: DEFAULT_RELEASE_GRACE,
        }
    }

    /// Remplace la fenêtre de grâce par défaut
    pub fn with_release_grace(mut self, grace: Duration) -> Self {
        self.release_grace = grace;
        self
    }

    /// Compose le texte d'une réponse
    ///
    /// Une réponse absente produit un texte vide, jamais une erreur. Les
    /// fragments sont lus dans leur ordre d'écriture.
    pub async fn compose(&self, login_id: i64, response_id: Option<i64>) -> String {
        let response_id = match response_id {
            Some(response_id) => response_id,
            None => return String::new(),
        };

        let mut components = match self.store.response_components(response_id).await {
            Ok(components) => components,
            Err(e) => {
                warn!("component lookup failed for response {}: {}", response_id, e);
                return String::new();
            }
        };
        components.sort_by_key(|component| component.index);

        let mut output = String::new();
        let mut touched = BTreeSet::new();

        for component in &components {
            match component.kind {
                ComponentKind::Text => {
                    if let Some(text) = component.text_variable("text") {
                        output.push_str(text);
                    }
                }
                ComponentKind::CurrentSong => {
                    if let Some(spotify_id) = component.integer_variable("spotify_id") {
                        if let Some(playing) =
                            self.now_playing.now_playing(login_id, spotify_id).await
                        {
                            output.push_str(&playing.title);
                        }
                        touched.insert(spotify_id);
                    }
                }
                ComponentKind::CurrentArtist => {
                    if let Some(spotify_id) = component.integer_variable("spotify_id") {
                        if let Some(playing) =
                            self.now_playing.now_playing(login_id, spotify_id).await
                        {
                            output.push_str(&linked_string(&playing.artists, ", ", " & "));
                        }
                        touched.insert(spotify_id);
                    }
                }
            }
        }

        // Un seul release par compte distinct touché pendant le rendu
        for spotify_id in touched {
            self.now_playing.release(spotify_id, self.release_grace).await;
        }

        output
    }
}
