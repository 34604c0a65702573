//! In-process storage for tests.
//!
//! Mirrors the `PostgreSQL` semantics that services rely on: one active cart
//! per owner, version checks on cart writes, compare-and-set order status,
//! and the back-in-stock reaction as a single locked step.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use musicshop_core::inventory::{is_out_of_stock, restock_message};
use musicshop_core::{
    Album, AlbumId, Artist, ArtistId, Cart, CartId, CartOwner, CartToken, CheckoutDetails,
    Customer, CustomerId, Email, Genre, GenreId, MediaType, MediaTypeId, Member, MemberId,
    Notification, NotificationId, Order, OrderId, OrderStatus, StockTransition, User, UserId,
};

use super::{
    CartStore, CatalogSeed, CatalogStore, CustomerStore, ImportSummary, InventoryStore,
    NewAccount, OrderStore, RepositoryError, StockUpdate, WishlistStore,
};

#[derive(Debug, Default)]
struct Inner {
    next_id: i32,
    genres: Vec<Genre>,
    media_types: Vec<MediaType>,
    members: Vec<Member>,
    artists: BTreeMap<ArtistId, Artist>,
    albums: BTreeMap<AlbumId, Album>,
    users: BTreeMap<UserId, (User, String)>,
    customers: BTreeMap<CustomerId, Customer>,
    carts: BTreeMap<CartId, Cart>,
    orders: BTreeMap<OrderId, Order>,
    /// Wish-listed albums with an insertion sequence for ordering.
    wishlist: BTreeMap<(CustomerId, AlbumId), i32>,
    notifications: Vec<Notification>,
}

impl Inner {
    const fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn active_cart(&self, owner: &CartOwner) -> Option<&Cart> {
        self.carts
            .values()
            .find(|cart| !cart.is_in_order() && cart.owner() == owner)
    }

    fn check_active(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let stored = self.carts.get(&cart.id()).ok_or(RepositoryError::NotFound)?;
        if stored.is_in_order() {
            return Err(RepositoryError::FrozenCart(cart.id()));
        }
        if stored.version() != cart.version() {
            return Err(RepositoryError::stale_cart(cart));
        }
        Ok(())
    }

    fn store_cart(&mut self, cart: &mut Cart) {
        cart.set_version(cart.version() + 1);
        self.carts.insert(cart.id(), cart.clone());
    }
}

/// Storage held entirely in memory. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored cart, active or not.
    pub async fn all_carts(&self) -> Vec<Cart> {
        self.inner.lock().await.carts.values().cloned().collect()
    }
}

impl CatalogStore for MemoryStore {
    async fn genres(&self) -> Result<Vec<Genre>, RepositoryError> {
        let mut genres = self.inner.lock().await.genres.clone();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    async fn genre_by_slug(&self, slug: &str) -> Result<Option<Genre>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.genres.iter().find(|g| g.slug == slug).cloned())
    }

    async fn media_types(&self) -> Result<Vec<MediaType>, RepositoryError> {
        let mut media = self.inner.lock().await.media_types.clone();
        media.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(media)
    }

    async fn artists(&self, genre: Option<GenreId>) -> Result<Vec<Artist>, RepositoryError> {
        let inner = self.inner.lock().await;
        let mut artists: Vec<Artist> = inner
            .artists
            .values()
            .filter(|artist| genre.is_none_or(|id| artist.genre.id == id))
            .cloned()
            .collect();
        artists.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(artists)
    }

    async fn artist_by_slug(&self, slug: &str) -> Result<Option<Artist>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.artists.values().find(|a| a.slug == slug).cloned())
    }

    async fn albums_by_artist(&self, artist: ArtistId) -> Result<Vec<Album>, RepositoryError> {
        let inner = self.inner.lock().await;
        let mut albums: Vec<Album> = inner
            .albums
            .values()
            .filter(|album| album.artist_id == artist)
            .cloned()
            .collect();
        albums.sort_by(|a, b| b.release_date.cmp(&a.release_date).then(a.id.cmp(&b.id)));
        Ok(albums)
    }

    async fn album(&self, id: AlbumId) -> Result<Option<Album>, RepositoryError> {
        Ok(self.inner.lock().await.albums.get(&id).cloned())
    }

    async fn album_by_slug(
        &self,
        artist_slug: &str,
        album_slug: &str,
    ) -> Result<Option<Album>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .albums
            .values()
            .find(|a| a.artist_slug == artist_slug && a.slug == album_slug)
            .cloned())
    }

    async fn offers_of_the_week(&self) -> Result<Vec<Album>, RepositoryError> {
        let inner = self.inner.lock().await;
        let mut albums: Vec<Album> = inner
            .albums
            .values()
            .filter(|album| album.offer_of_the_week)
            .cloned()
            .collect();
        albums.sort_by(|a, b| (&a.artist_name, &a.name).cmp(&(&b.artist_name, &b.name)));
        Ok(albums)
    }

    async fn import_catalog(&self, seed: &CatalogSeed) -> Result<ImportSummary, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let mut summary = ImportSummary::default();

        for genre in &seed.genres {
            if let Some(existing) = inner.genres.iter_mut().find(|g| g.slug == genre.slug) {
                existing.name.clone_from(&genre.name);
            } else {
                let id = GenreId::new(inner.next_id());
                inner.genres.push(Genre {
                    id,
                    name: genre.name.clone(),
                    slug: genre.slug.clone(),
                });
            }
            summary.genres += 1;
        }

        for media in &seed.media_types {
            if !inner.media_types.iter().any(|m| m.name == media.name) {
                let id = MediaTypeId::new(inner.next_id());
                inner.media_types.push(MediaType {
                    id,
                    name: media.name.clone(),
                });
            }
            summary.media_types += 1;
        }

        for member in &seed.members {
            if let Some(existing) = inner.members.iter_mut().find(|m| m.slug == member.slug) {
                existing.name.clone_from(&member.name);
            } else {
                let id = MemberId::new(inner.next_id());
                inner.members.push(Member {
                    id,
                    name: member.name.clone(),
                    slug: member.slug.clone(),
                });
            }
            summary.members += 1;
        }

        for artist in &seed.artists {
            let genre = inner
                .genres
                .iter()
                .find(|g| g.slug == artist.genre)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;
            let members = artist
                .members
                .iter()
                .map(|slug| {
                    inner
                        .members
                        .iter()
                        .find(|m| &m.slug == slug)
                        .cloned()
                        .ok_or(RepositoryError::NotFound)
                })
                .collect::<Result<Vec<_>, _>>()?;

            let existing = inner
                .artists
                .values()
                .find(|a| a.slug == artist.slug)
                .map(|a| a.id);
            let id = match existing {
                Some(id) => id,
                None => ArtistId::new(inner.next_id()),
            };
            inner.artists.insert(
                id,
                Artist {
                    id,
                    name: artist.name.clone(),
                    genre,
                    members,
                    slug: artist.slug.clone(),
                },
            );
            summary.artists += 1;
        }

        for album in &seed.albums {
            let artist = inner
                .artists
                .values()
                .find(|a| a.slug == album.artist)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;
            let media_type = inner
                .media_types
                .iter()
                .find(|m| m.name == album.media_type)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;

            let existing = inner
                .albums
                .values()
                .find(|a| a.artist_id == artist.id && a.slug == album.slug)
                .map(|a| (a.id, a.stock));
            let (id, stock) = match existing {
                Some(found) => {
                    summary.albums_updated += 1;
                    found
                }
                None => {
                    summary.albums_created += 1;
                    (AlbumId::new(inner.next_id()), album.stock)
                }
            };

            inner.albums.insert(
                id,
                Album {
                    id,
                    artist_id: artist.id,
                    artist_name: artist.name.clone(),
                    artist_slug: artist.slug.clone(),
                    name: album.name.clone(),
                    media_type,
                    song_list: album.song_list(),
                    release_date: album.release_date,
                    slug: album.slug.clone(),
                    description: album.description.clone(),
                    price: album.price,
                    stock,
                    out_of_stock: is_out_of_stock(stock),
                    offer_of_the_week: album.offer_of_the_week,
                },
            );
        }

        Ok(summary)
    }
}

impl CustomerStore for MemoryStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn user_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .cloned())
    }

    async fn register(&self, account: NewAccount) -> Result<(User, Customer), RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|(user, _)| user.email == account.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(inner.next_id()),
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            created_at: Utc::now(),
        };
        let customer = Customer {
            id: CustomerId::new(inner.next_id()),
            user_id: user.id,
            phone: account.phone,
            address: account.address,
            is_active: true,
        };
        inner
            .users
            .insert(user.id, (user.clone(), account.password_hash));
        inner.customers.insert(customer.id, customer.clone());
        Ok((user, customer))
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.inner.lock().await.customers.get(&id).cloned())
    }

    async fn ensure_customer(&self, user: UserId) -> Result<(Customer, bool), RepositoryError> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(existing) = inner.customers.values().find(|c| c.user_id == user) {
            return Ok((existing.clone(), false));
        }

        let customer = Customer {
            id: CustomerId::new(inner.next_id()),
            user_id: user,
            phone: String::new(),
            address: String::new(),
            is_active: true,
        };
        inner.customers.insert(customer.id, customer.clone());
        Ok((customer, true))
    }
}

impl CartStore for MemoryStore {
    async fn active_cart_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.active_cart(&CartOwner::Customer(customer)).cloned())
    }

    async fn active_cart_for_token(
        &self,
        token: &CartToken,
    ) -> Result<Option<Cart>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .active_cart(&CartOwner::Anonymous(token.clone()))
            .cloned())
    }

    async fn create_cart(&self, owner: &CartOwner) -> Result<Cart, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner.active_cart(owner).is_some() {
            return Err(RepositoryError::Conflict(
                "active cart already exists".to_owned(),
            ));
        }
        let cart = Cart::new(CartId::new(inner.next_id()), owner.clone(), Utc::now());
        inner.carts.insert(cart.id(), cart.clone());
        Ok(cart)
    }

    async fn save_cart(&self, cart: &mut Cart) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.check_active(cart)?;
        inner.store_cart(cart);
        Ok(())
    }

    async fn save_merged_cart(
        &self,
        merged: &mut Cart,
        absorbed: &Cart,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.check_active(merged)?;
        inner.check_active(absorbed)?;
        inner.store_cart(merged);
        inner.carts.remove(&absorbed.id());
        Ok(())
    }
}

impl OrderStore for MemoryStore {
    async fn place_order(
        &self,
        cart: &mut Cart,
        customer: CustomerId,
        details: &CheckoutDetails,
    ) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.check_active(cart)?;

        let order = Order {
            id: OrderId::new(inner.next_id()),
            customer_id: customer,
            cart_id: cart.id(),
            first_name: details.first_name.clone(),
            last_name: details.last_name.clone(),
            phone: details.phone.clone(),
            address: details.address.clone(),
            buying_type: details.buying_type,
            comment: details.comment.clone(),
            status: OrderStatus::New,
            created_at: Utc::now(),
            order_date: details.order_date,
        };
        inner.orders.insert(order.id, order.clone());

        // Storage only flips the flag; the caller's copy is already frozen.
        let mut frozen = cart.clone();
        if !frozen.is_in_order() {
            frozen
                .mark_in_order()
                .map_err(|_| RepositoryError::FrozenCart(cart.id()))?;
        }
        inner.store_cart(&mut frozen);
        cart.set_version(frozen.version());
        Ok(order)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.inner.lock().await.orders.get(&id).cloned())
    }

    async fn orders_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .values()
            .rev()
            .filter(|order| order.customer_id == customer)
            .cloned()
            .collect())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let order = inner.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if order.status != from {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is {}, expected {from}",
                order.status
            )));
        }
        order.status = to;
        Ok(order.clone())
    }
}

impl WishlistStore for MemoryStore {
    async fn add_to_wishlist(
        &self,
        customer: CustomerId,
        album: AlbumId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if !inner.albums.contains_key(&album) || !inner.customers.contains_key(&customer) {
            return Err(RepositoryError::NotFound);
        }
        if inner.wishlist.contains_key(&(customer, album)) {
            return Ok(false);
        }
        let seq = inner.next_id();
        inner.wishlist.insert((customer, album), seq);
        Ok(true)
    }

    async fn remove_from_wishlist(
        &self,
        customer: CustomerId,
        album: AlbumId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.wishlist.remove(&(customer, album)).is_some())
    }

    async fn wishlist(&self, customer: CustomerId) -> Result<Vec<Album>, RepositoryError> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<(i32, AlbumId)> = inner
            .wishlist
            .iter()
            .filter(|((owner, _), _)| *owner == customer)
            .map(|((_, album), seq)| (*seq, *album))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries
            .into_iter()
            .filter_map(|(_, album)| inner.albums.get(&album).cloned())
            .collect())
    }

    async fn notifications(
        &self,
        customer: CustomerId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient == customer && (!unread_only || !n.read))
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        customer: CustomerId,
        id: NotificationId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let found = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient == customer && !n.read);
        match found {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(
        &self,
        customer: CustomerId,
    ) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let mut changed = 0;
        for notification in &mut inner.notifications {
            if notification.recipient == customer && !notification.read {
                notification.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

impl InventoryStore for MemoryStore {
    async fn apply_stock_level(
        &self,
        album: AlbumId,
        stock: i32,
    ) -> Result<StockUpdate, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let record = inner.albums.get_mut(&album).ok_or(RepositoryError::NotFound)?;
        let transition = StockTransition::new(record.stock, stock);
        record.stock = stock;
        record.out_of_stock = is_out_of_stock(stock);
        let updated = record.clone();

        let mut notified = Vec::new();
        if transition.is_restock() {
            let wishers: BTreeSet<CustomerId> = inner
                .wishlist
                .keys()
                .filter(|(_, wished)| *wished == album)
                .map(|(customer, _)| *customer)
                .collect();
            let text = restock_message(&updated);
            for customer in wishers {
                inner.wishlist.remove(&(customer, album));
                let id = NotificationId::new(inner.next_id());
                inner.notifications.push(Notification {
                    id,
                    recipient: customer,
                    album_id: Some(album),
                    text: text.clone(),
                    read: false,
                    created_at: Utc::now(),
                });
                notified.push(customer);
            }
        }

        Ok(StockUpdate {
            album: updated,
            transition,
            notified,
        })
    }
}
