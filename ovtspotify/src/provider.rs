//! Fournisseur "now playing" avec cache et rafraîchissement de jeton
//!
//! Ce module fournit la résolution haut-niveau du morceau en cours pour un
//! compte lié: cache TTL, résolution du compte via la liste en cache,
//! fetch amont et protocole de rafraîchissement borné à une seule relance.
//! Aucune erreur ne remonte à l'appelant: tout échec se résout en absence.

use crate::client::SpotifyApi;
use crate::models::PlayingStatus;
use ovtcache::TtlCache;
use ovtstore::{NowPlaying, NowPlayingSource, SpotifyAccount, Storage};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// TTL par défaut d'une valeur now-playing validée
pub const DEFAULT_NOW_PLAYING_TTL: Duration = Duration::from_secs(60);

/// TTL par défaut de la liste de comptes d'un login
pub const DEFAULT_ACCOUNTS_TTL: Duration = Duration::from_secs(10);

/// Fournisseur du morceau en cours, implémente [`NowPlayingSource`]
///
/// Les deux caches sont des instances explicites possédées par le service de
/// résolution et passées à la construction; le fournisseur n'a aucun état
/// global.
pub struct NowPlayingProvider {
    /// Accès amont (client HTTP ou double de test)
    api: Arc<dyn SpotifyApi>,
    /// Collaborateur de persistance
    store: Arc<dyn Storage>,
    /// Cache now-playing (clé: id de compte)
    now_playing_cache: Arc<TtlCache<i64, NowPlaying>>,
    /// Cache des listes de comptes (clé: id de login)
    accounts_cache: Arc<TtlCache<i64, Vec<SpotifyAccount>>>,
    /// TTL des valeurs now-playing
    now_playing_ttl: Duration,
    /// TTL des listes de comptes
    accounts_ttl: Duration,
}

impl NowPlayingProvider {
    /// Crée un fournisseur avec les TTL par défaut
    pub fn new(
        api: Arc<dyn SpotifyApi>,
        store: Arc<dyn Storage>,
        now_playing_cache: Arc<TtlCache<i64, NowPlaying>>,
        accounts_cache: Arc<TtlCache<i64, Vec<SpotifyAccount>>>,
    ) -> Self {
        Self {
            api,
            store,
            now_playing_cache,
            accounts_cache,
            now_playing_ttl: DEFAULT_NOW_PLAYING_TTL,
            accounts_ttl: DEFAULT_ACCOUNTS_TTL,
        }
    }

    /// Remplace les TTL par défaut
    ///
    /// Les constantes par défaut sont des heuristiques réglées pour que
    /// plusieurs fragments d'un même rendu s'amortissent en un seul aller
    /// storage et un seul fetch amont par compte; elles restent réglables
    /// sans sémantique plus stricte.
    pub fn with_ttls(mut self, now_playing_ttl: Duration, accounts_ttl: Duration) -> Self {
        self.now_playing_ttl = now_playing_ttl;
        self.accounts_ttl = accounts_ttl;
        self
    }

    /// Résout le morceau en cours pour un compte
    ///
    /// # Logique
    ///
    /// 1. Vérifie le cache now-playing
    /// 2. Résout le compte via la liste en cache (sinon un aller storage)
    /// 3. Fetch amont avec le jeton d'accès courant
    /// 4. Sur premier refus d'autorisation: rafraîchit le jeton, persiste,
    ///    relance une seule fois
    /// 5. Met la valeur validée en cache avant de la retourner
    async fn load_now_playing(&self, login_id: i64, account_id: i64) -> Option<NowPlaying> {
        if let Some(cached) = self.now_playing_cache.get(&account_id).await {
            debug!("now-playing for account {} found in cache", account_id);
            return Some(cached);
        }

        let account = self.resolve_account(login_id, account_id).await?;
        let playing = self.fetch_with_refresh(account).await?;

        self.now_playing_cache
            .store(account_id, playing.clone(), self.now_playing_ttl)
            .await;

        Some(playing)
    }

    /// Retrouve le compte cible dans la liste (mise en cache) de son login
    async fn resolve_account(&self, login_id: i64, account_id: i64) -> Option<SpotifyAccount> {
        let accounts = match self.accounts_cache.get(&login_id).await {
            Some(accounts) => accounts,
            None => {
                let accounts = match self.store.spotify_accounts_by_login(login_id).await {
                    Ok(accounts) => accounts,
                    Err(e) => {
                        warn!("account lookup failed for login {}: {}", login_id, e);
                        return None;
                    }
                };
                self.accounts_cache
                    .store(login_id, accounts.clone(), self.accounts_ttl)
                    .await;
                accounts
            }
        };

        accounts.into_iter().find(|account| account.id == account_id)
    }

    /// Fetch amont avec au plus un rafraîchissement puis une unique relance
    ///
    /// La borne est explicite dans la boucle: un second refus d'autorisation,
    /// ou un échec du rafraîchissement, se résout en absence.
    async fn fetch_with_refresh(&self, mut account: SpotifyAccount) -> Option<NowPlaying> {
        for attempt in 0..2 {
            let status = match self.api.currently_playing(&account.access_token).await {
                Ok(status) => status,
                Err(e) => {
                    debug!("currently-playing fetch failed: {}", e);
                    return None;
                }
            };

            match status {
                PlayingStatus::Playing(now_playing) => return Some(now_playing),
                PlayingStatus::Unauthorized if attempt == 0 => {
                    debug!("access token rejected for account {}, refreshing", account.id);
                    account = self.refresh_account(&account).await?;
                }
                PlayingStatus::Unauthorized => {
                    debug!("access token rejected again after refresh");
                    return None;
                }
                PlayingStatus::UpstreamError(code) => {
                    debug!("upstream error {} for account {}", code, account.id);
                    return None;
                }
                PlayingStatus::MalformedPayload => {
                    debug!("unusable currently-playing payload for account {}", account.id);
                    return None;
                }
            }
        }

        None
    }

    /// Échange le refresh token et persiste la nouvelle paire
    ///
    /// Un échec, où qu'il survienne, laisse la paire stockée intacte: la
    /// persistance n'a lieu qu'après validation complète de la réponse du
    /// token endpoint. Un refresh token absent de la réponse est remplacé
    /// par celui déjà stocké.
    async fn refresh_account(&self, account: &SpotifyAccount) -> Option<SpotifyAccount> {
        let refreshed = match self.api.refresh_tokens(&account.refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!("token refresh failed for account {}: {}", account.id, e);
                return None;
            }
        };

        let refresh_token = refreshed
            .refresh_token
            .unwrap_or_else(|| account.refresh_token.clone());

        let updated = match self
            .store
            .update_spotify_tokens(
                account,
                &refreshed.access_token,
                &refresh_token,
                &refreshed.scopes,
                refreshed.validity,
            )
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                warn!("failed to persist refreshed tokens for account {}: {}", account.id, e);
                return None;
            }
        };

        // Répercuter la nouvelle paire dans la liste en cache, sinon un
        // fragment suivant repartirait avec l'ancien jeton
        if let Some(mut accounts) = self.accounts_cache.get(&account.login_id).await {
            if let Some(stored) = accounts.iter_mut().find(|a| a.id == account.id) {
                *stored = updated.clone();
                self.accounts_cache
                    .store(account.login_id, accounts, self.accounts_ttl)
                    .await;
            }
        }

        Some(updated)
    }
}

#[async_trait]
impl NowPlayingSource for NowPlayingProvider {
    async fn now_playing(&self, login_id: i64, account_id: i64) -> Option<NowPlaying> {
        self.load_now_playing(login_id, account_id).await
    }

    async fn release(&self, account_id: i64, grace: Duration) {
        self.now_playing_cache.release(&account_id, grace).await;
    }
}
