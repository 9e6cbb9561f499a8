use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use super::{BookingFilter, Store, StoreError, TicketFilter};
use crate::database::Database;
use crate::models::{
    Booking, BookingStatus, BookingWithTicket, DailyListings, DailySales, Payment,
    ProfileUpdate, Role, Ticket, TicketStatus, User,
};

#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Turns a caller-supplied search term into an `ILIKE` substring pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn unique_violation(err: sqlx::Error, what: &'static str) -> StoreError {
    let is_unique = err
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation());
    if is_unique {
        StoreError::Duplicate(what)
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user_if_absent(&self, user: &User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, photo_url, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.photo_url)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.db.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE $1::text IS NULL OR display_name ILIKE $1 OR email ILIKE $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(search.map(like_pattern))
        .fetch_all(&self.db.pool)
        .await?;
        Ok(users)
    }

    async fn update_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET phone = COALESCE($2, phone),
                address = COALESCE($3, address),
                city = COALESCE($4, city),
                bio = COALESCE($5, bio)
            WHERE email = $1
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(&update.city)
        .bind(&update.bio)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(user)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(user)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, owner_email, title, from_location, to_location, transport_type,
                price, quantity, departure_at, perks, image_url, status, is_advertised, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(ticket.id)
        .bind(&ticket.owner_email)
        .bind(&ticket.title)
        .bind(&ticket.from_location)
        .bind(&ticket.to_location)
        .bind(&ticket.transport_type)
        .bind(ticket.price)
        .bind(ticket.quantity)
        .bind(ticket.departure_at)
        .bind(&ticket.perks)
        .bind(&ticket.image_url)
        .bind(ticket.status.as_str())
        .bind(ticket.is_advertised)
        .bind(ticket.created_at)
        .execute(&self.db.pool)
        .await
        .map_err(|e| unique_violation(e, "ticket"))?;
        Ok(())
    }

    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(ticket)
    }

    async fn list_tickets(&self, filter: TicketFilter<'_>) -> Result<Vec<Ticket>, StoreError> {
        let query = match filter {
            TicketFilter::All { search } => sqlx::query_as::<_, Ticket>(
                r#"
                SELECT * FROM tickets
                WHERE $1::text IS NULL OR title ILIKE $1 OR owner_email ILIKE $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(search.map(like_pattern)),
            TicketFilter::Available => sqlx::query_as::<_, Ticket>(
                r#"
                SELECT * FROM tickets
                WHERE status = 'approved' AND quantity > 0
                ORDER BY created_at DESC
                "#,
            ),
            TicketFilter::Advertised => sqlx::query_as::<_, Ticket>(
                "SELECT * FROM tickets WHERE is_advertised ORDER BY created_at DESC",
            ),
            TicketFilter::OwnedBy(email) => sqlx::query_as::<_, Ticket>(
                "SELECT * FROM tickets WHERE owner_email = $1 ORDER BY created_at DESC",
            )
            .bind(email.to_string()),
        };

        Ok(query.fetch_all(&self.db.pool).await?)
    }

    async fn set_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(ticket)
    }

    async fn set_ticket_advertised(
        &self,
        id: Uuid,
        advertised: bool,
    ) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET is_advertised = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(advertised)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(ticket)
    }

    async fn decrement_ticket_quantity(
        &self,
        id: Uuid,
        by: i32,
    ) -> Result<Option<Ticket>, StoreError> {
        // Check and decrement in one statement; Postgres row locking serializes
        // concurrent decrements of the same ticket.
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET quantity = quantity - $2
            WHERE id = $1 AND quantity >= $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(by)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(ticket)
    }

    async fn delete_tickets_by_owner(&self, owner_email: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tickets WHERE owner_email = $1")
            .bind(owner_email)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, ticket_id, customer_email, vendor_email, quantity,
                unit_price, total_price, status, payment_id, tracking_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(booking.id)
        .bind(booking.ticket_id)
        .bind(&booking.customer_email)
        .bind(&booking.vendor_email)
        .bind(booking.quantity)
        .bind(booking.unit_price)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(&booking.payment_id)
        .bind(&booking.tracking_id)
        .bind(booking.created_at)
        .execute(&self.db.pool)
        .await
        .map_err(|e| unique_violation(e, "booking"))?;
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(booking)
    }

    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $2 WHERE id = $1 AND status <> 'paid' RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(booking)
    }

    async fn mark_booking_paid(
        &self,
        id: Uuid,
        payment_id: &str,
        tracking_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = 'paid', payment_id = $2, tracking_id = $3
            WHERE id = $1 AND status NOT IN ('paid', 'rejected')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payment_id)
        .bind(tracking_id)
        .fetch_optional(&self.db.pool)
        .await
        .map_err(|e| unique_violation(e, "tracking id"))?;
        Ok(booking)
    }

    async fn revert_booking_payment(
        &self,
        id: Uuid,
        tracking_id: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'unpaid', payment_id = NULL, tracking_id = NULL
            WHERE id = $1 AND status = 'paid' AND tracking_id = $2
            "#,
        )
        .bind(id)
        .bind(tracking_id)
        .execute(&self.db.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_bookings(
        &self,
        filter: BookingFilter<'_>,
    ) -> Result<Vec<BookingWithTicket>, StoreError> {
        let bookings = match filter {
            BookingFilter::Customer(email) => sqlx::query_as::<_, Booking>(
                "SELECT * FROM bookings WHERE customer_email = $1 ORDER BY created_at DESC",
            )
            .bind(email),
            BookingFilter::Vendor(email) => sqlx::query_as::<_, Booking>(
                "SELECT * FROM bookings WHERE vendor_email = $1 ORDER BY created_at DESC",
            )
            .bind(email),
        }
        .fetch_all(&self.db.pool)
        .await?;

        let ticket_ids: Vec<Uuid> = bookings.iter().map(|b| b.ticket_id).collect();
        let tickets: HashMap<Uuid, Ticket> = if ticket_ids.is_empty() {
            HashMap::new()
        } else {
            sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = ANY($1)")
                .bind(&ticket_ids)
                .fetch_all(&self.db.pool)
                .await?
                .into_iter()
                .map(|t| (t.id, t))
                .collect()
        };

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let ticket = tickets.get(&booking.ticket_id).cloned();
                BookingWithTicket { booking, ticket }
            })
            .collect())
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, booking_id, ticket_id, ticket_title, amount,
                customer_email, transaction_id, payment_status, paid_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.ticket_id)
        .bind(&payment.ticket_title)
        .bind(payment.amount)
        .bind(&payment.customer_email)
        .bind(&payment.transaction_id)
        .bind(&payment.payment_status)
        .bind(payment.paid_at)
        .execute(&self.db.pool)
        .await
        .map_err(|e| unique_violation(e, "payment"))?;
        Ok(())
    }

    async fn find_payment_by_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, StoreError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(payment)
    }

    async fn list_payments_for_customer(&self, email: &str) -> Result<Vec<Payment>, StoreError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE customer_email = $1 ORDER BY paid_at DESC",
        )
        .bind(email)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(payments)
    }

    async fn daily_sales(&self, vendor_email: &str) -> Result<Vec<DailySales>, StoreError> {
        let rows = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   COALESCE(SUM(total_price), 0)::BIGINT AS revenue,
                   COALESCE(SUM(quantity), 0)::BIGINT AS sold
            FROM bookings
            WHERE vendor_email = $1 AND status = 'paid'
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(vendor_email)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows)
    }

    async fn daily_listings(&self, vendor_email: &str) -> Result<Vec<DailyListings>, StoreError> {
        let rows = sqlx::query_as::<_, DailyListings>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   COUNT(*)::BIGINT AS added
            FROM tickets
            WHERE owner_email = $1
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(vendor_email)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows)
    }
}
