//! Booking notifications.
//!
//! Delivery is best-effort: callers log a failed send and carry on.

use crate::models::BookingDetails;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

pub trait Notifier: Send + Sync {
    /// Tells the item owner that someone asked to rent their item.
    fn booking_requested(&self, booking: &BookingDetails) -> Result<(), NotifyError>;

    /// Tells the renter that the owner confirmed their booking.
    fn booking_approved(&self, booking: &BookingDetails) -> Result<(), NotifyError>;
}

/// A rendered email. Nothing is sent over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

const DATE_FORMAT: &str = "%B %d, %Y";

pub fn booking_request_email(booking: &BookingDetails) -> Email {
    let item = &booking.item.item;
    let owner = &booking.item.owner;
    let renter = &booking.renter;
    let body = format!(
        "Hello {owner_name},\n\n\
         You have a new rental request from {renter_name} for your item: '{item_name}'.\n\n\
         Booking Details:\n\
         - Renter's Email: {renter_email}\n\
         - Requested Dates: {start} to {end}\n\
         - Total Price: ${price:.2}\n\n\
         Please log in to your account to approve or deny this request.\n",
        owner_name = owner.display_name(),
        renter_name = renter.display_name(),
        item_name = item.name,
        renter_email = renter.email,
        start = booking.booking.start_date.format(DATE_FORMAT),
        end = booking.booking.end_date.format(DATE_FORMAT),
        price = booking.booking.total_price,
    );
    Email {
        to: owner.email.clone(),
        subject: format!("New Rental Request for {}", item.name),
        body,
    }
}

pub fn booking_approval_email(booking: &BookingDetails) -> Email {
    let item = &booking.item.item;
    let owner = &booking.item.owner;
    let renter = &booking.renter;
    let body = format!(
        "Hello {renter_name},\n\n\
         Great news! Your rental request for '{item_name}' has been approved by {owner_name}.\n\n\
         Booking Details:\n\
         - Rental Dates: {start} to {end}\n\
         - Total Price: ${price:.2}\n\
         - Owner's Email: {owner_email}\n\n\
         Pickup Address:\n\
         {address}\n\n\
         Please coordinate with the owner for pickup details.\n",
        renter_name = renter.display_name(),
        item_name = item.name,
        owner_name = owner.display_name(),
        start = booking.booking.start_date.format(DATE_FORMAT),
        end = booking.booking.end_date.format(DATE_FORMAT),
        price = booking.booking.total_price,
        owner_email = owner.email,
        address = item.pickup_address(),
    );
    Email {
        to: renter.email.clone(),
        subject: format!("Your Booking for {} has been Confirmed!", item.name),
        body,
    }
}

/// Renders the emails and writes them to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailLogNotifier;

impl EmailLogNotifier {
    fn deliver(&self, email: Email) -> Result<(), NotifyError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "simulated email notification"
        );
        Ok(())
    }
}

impl Notifier for EmailLogNotifier {
    fn booking_requested(&self, booking: &BookingDetails) -> Result<(), NotifyError> {
        self.deliver(booking_request_email(booking))
    }

    fn booking_approved(&self, booking: &BookingDetails) -> Result<(), NotifyError> {
        self.deliver(booking_approval_email(booking))
    }
}
