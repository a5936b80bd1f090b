//! Line-oriented host for the storefront.
//!
//! Reads one command per line, dispatches it to the matching view intent and
//! writes whatever is on screen afterwards: the modal content when the modal
//! is open, otherwise the page.
//!
//! ```text
//! catalog | open <id> | toggle | basket | remove <id> | checkout
//! pay card|cash | address <text> | next | email <text> | phone <text>
//! blur address|email|phone | confirm | close | show | help | quit
//! ```

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::str::FromStr;

use larek_core::{PaymentMethod, ProductId};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Notify;

use crate::api::CommerceApi;
use crate::error::Result;
use crate::events::{Event, EventKind};
use crate::models::FormField;
use crate::presenter::{Screen, Storefront};

const HELP: &str = "\
commands:
  catalog              show the gallery
  open <id>            preview a product
  toggle               add/remove the previewed product
  basket               open the basket
  remove <id>          remove a product from the basket
  checkout             start checkout
  pay card|cash        choose the payment method
  address <text>       set the delivery address
  next                 continue to contacts
  email <text>         set the email
  phone <text>         set the phone
  blur <field>         leave address, email or phone
  confirm              place the order
  close                close the modal
  show                 print the current screen
  quit                 exit";

/// Errors from parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid argument for `{0}`: {1}")]
    InvalidArgument(&'static str, String),
}

/// One host command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Catalog,
    Open(ProductId),
    Toggle,
    Basket,
    Remove(ProductId),
    Checkout,
    Pay(PaymentMethod),
    Address(String),
    Next,
    Email(String),
    Phone(String),
    Blur(FormField),
    Confirm,
    Close,
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let required = |name: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };

        Ok(match word.to_ascii_lowercase().as_str() {
            "catalog" => Self::Catalog,
            "open" => Self::Open(ProductId::new(required("open")?)),
            "toggle" | "buy" => Self::Toggle,
            "basket" => Self::Basket,
            "remove" => Self::Remove(ProductId::new(required("remove")?)),
            "checkout" => Self::Checkout,
            "pay" => Self::Pay(
                required("pay")?
                    .parse()
                    .map_err(|e| CommandError::InvalidArgument("pay", e))?,
            ),
            // Empty values are allowed so fields can be cleared.
            "address" => Self::Address(rest.to_string()),
            "next" => Self::Next,
            "email" => Self::Email(rest.to_string()),
            "phone" => Self::Phone(rest.to_string()),
            "blur" => Self::Blur(
                required("blur")?
                    .parse()
                    .map_err(|e| CommandError::InvalidArgument("blur", e))?,
            ),
            "confirm" | "pay-now" => Self::Confirm,
            "close" => Self::Close,
            "show" | "" => Self::Show,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        })
    }
}

/// Drives a [`Storefront`] from text commands.
pub struct Host<A: CommerceApi + 'static> {
    app: Rc<Storefront<A>>,
    outbox: Rc<RefCell<Vec<String>>>,
    settled: Rc<Notify>,
}

impl<A: CommerceApi + 'static> Host<A> {
    /// Attach to `app`, collecting order results for display.
    #[must_use]
    pub fn new(app: Rc<Storefront<A>>) -> Self {
        let outbox = Rc::new(RefCell::new(Vec::new()));
        let settled = Rc::new(Notify::new());

        for kind in [EventKind::OrderPlaced, EventKind::OrderFailed] {
            let outbox = Rc::clone(&outbox);
            let settled = Rc::clone(&settled);
            app.bus().on(kind, move |event| {
                let line = match event {
                    Event::OrderPlaced(total) => format!("order placed: charged {total}"),
                    Event::OrderFailed(message) => format!("order failed: {message}"),
                    _ => return,
                };
                outbox.borrow_mut().push(line);
                settled.notify_one();
            });
        }

        Self {
            app,
            outbox,
            settled,
        }
    }

    /// Execute one command. Returns `false` on `quit`.
    ///
    /// Waits for an order submission started by `confirm` to settle.
    pub async fn execute(&self, command: Command) -> bool {
        let app = &self.app;
        match command {
            Command::Catalog => {
                if app.modal().is_open() {
                    self.log_view_error(app.close_modal());
                }
            }
            Command::Open(id) => {
                if app.products().get_product(&id).is_some() {
                    app.card().select(&id);
                } else if let Err(e) = app.open_product(&id).await {
                    self.say(format!("cannot open {id}: {e}"));
                }
            }
            Command::Toggle => app.preview().toggle(),
            Command::Basket => app.page().open_basket(),
            Command::Remove(id) => app.basket().remove(&id),
            Command::Checkout => {
                if !app.basket().checkout_enabled() {
                    self.say("basket is empty".to_string());
                }
                app.basket().checkout();
            }
            Command::Pay(method) => app.order_form().select_payment(method),
            Command::Address(address) => app.order_form().input_address(&address),
            Command::Next => app.order_form().submit(),
            Command::Email(email) => app.contacts_form().input_email(&email),
            Command::Phone(phone) => app.contacts_form().input_phone(&phone),
            Command::Blur(FormField::Address) => app.order_form().blur_address(),
            Command::Blur(field) => app.contacts_form().blur(field),
            Command::Confirm => {
                app.contacts_form().submit();
                if app.is_submitting() {
                    self.settled.notified().await;
                }
            }
            Command::Close => {
                if app.current_screen() == Screen::Success {
                    app.success().close();
                } else {
                    self.log_view_error(app.close_modal());
                }
            }
            Command::Show => {}
            Command::Help => self.say(HELP.to_string()),
            Command::Quit => return false,
        }
        true
    }

    /// Markup currently on screen.
    #[must_use]
    pub fn frame(&self) -> String {
        if self.app.modal().is_open() {
            self.app.modal().content()
        } else {
            self.app.page().html()
        }
    }

    /// Drain messages produced since the last call.
    #[must_use]
    pub fn take_messages(&self) -> Vec<String> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }

    /// Read commands from `input` until EOF or `quit`, writing each frame
    /// and message to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input or writing output fails.
    pub async fn run<R, W>(&self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        writeln!(out, "{}", self.frame())?;

        while let Some(line) = lines.next_line().await? {
            let keep_going = match line.parse::<Command>() {
                Ok(command) => {
                    tracing::debug!(?command, "command");
                    let keep_going = self.execute(command).await;
                    if keep_going {
                        writeln!(out, "{}", self.frame())?;
                    }
                    keep_going
                }
                Err(e) => {
                    self.say(e.to_string());
                    true
                }
            };

            for message in self.take_messages() {
                writeln!(out, "# {message}")?;
            }
            out.flush()?;

            if !keep_going {
                break;
            }
        }
        Ok(())
    }

    fn say(&self, message: String) {
        self.outbox.borrow_mut().push(message);
    }

    fn log_view_error(&self, result: std::result::Result<(), crate::views::ViewError>) {
        if let Err(e) = result {
            crate::error::report_error("failed to update view", &e);
            self.say(e.to_string());
        }
    }
}
