use anyhow::Context as _;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};
use qrcode::{Color as Module, QrCode};

use crate::domain::repository::TicketRenderer;
use crate::domain::types::{Contact, Order, Ticket};
use crate::error::TicketsServiceError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const QR_SIZE: f32 = 90.0;
/// Light modules around the symbol, in modules.
const QUIET_ZONE: usize = 4;

/// What the entrance scanner reads off a ticket.
pub fn qr_payload(order_id: i64, ticket: &Ticket) -> String {
    format!("{order_id}-{}", ticket.uuid)
}

/// One A4 page per ticket: text block on top, QR code below.
#[derive(Clone)]
pub struct PdfTicketRenderer {
    pub venue: String,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl TicketRenderer for PdfTicketRenderer {
    fn render(&self, order: &Order, client: &Contact) -> Result<Vec<u8>, TicketsServiceError> {
        if order.tickets.is_empty() {
            return Err(TicketsServiceError::validation("order", "has no tickets"));
        }
        let title = format!("{} - order {}", self.venue, order.id);
        let (doc, first_page, first_layer) =
            PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "ticket");
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .context("load regular font")?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .context("load bold font")?,
        };

        for (index, ticket) in order.tickets.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "ticket");
                doc.get_page(page).get_layer(layer)
            };
            self.draw_ticket(&layer, &fonts, order, client, ticket, index + 1)?;
        }

        let bytes = doc
            .save_to_bytes()
            .context("serialize tickets pdf")
            .map_err(TicketsServiceError::upstream)?;
        Ok(bytes)
    }
}

impl PdfTicketRenderer {
    fn draw_ticket(
        &self,
        layer: &PdfLayerReference,
        fonts: &Fonts,
        order: &Order,
        client: &Contact,
        ticket: &Ticket,
        number: usize,
    ) -> Result<(), TicketsServiceError> {
        let top = PAGE_HEIGHT - MARGIN;
        layer.use_text(&self.venue, 24.0, Mm(MARGIN), Mm(top), &fonts.bold);
        layer.use_text(
            format!("Ticket {number} of {}", order.tickets.len()),
            12.0,
            Mm(MARGIN),
            Mm(top - 10.0),
            &fonts.regular,
        );

        let event = &ticket.event;
        let lines = [
            format!("Order: #{}", order.id),
            format!("Ticket: {}", ticket.uuid),
            format!("Client: {}", client.full_name()),
            format!("Admission: {}", event.event_type),
            format!("From: {}", event.start_at.format("%Y-%m-%d %H:%M UTC")),
            format!("Until: {}", event.end_at.format("%Y-%m-%d %H:%M UTC")),
            format!("Price: ${}", event.price),
        ];
        for (i, line) in lines.iter().enumerate() {
            let y = top - 25.0 - (i as f32) * 8.0;
            layer.use_text(line, 12.0, Mm(MARGIN), Mm(y), &fonts.regular);
        }

        let code = QrCode::new(qr_payload(order.id, ticket).as_bytes())
            .context("encode ticket qr")
            .map_err(TicketsServiceError::upstream)?;
        let x = (PAGE_WIDTH - QR_SIZE) / 2.0;
        draw_qr(layer, &code, x, 50.0, QR_SIZE);
        Ok(())
    }
}

/// Fill dark modules as rectangles, merging horizontal runs. `(x, y)` is the
/// lower-left corner of the symbol including its quiet zone.
fn draw_qr(layer: &PdfLayerReference, code: &QrCode, x: f32, y: f32, size: f32) {
    let width = code.width();
    let modules = code.to_colors();
    let unit = size / (width + 2 * QUIET_ZONE) as f32;

    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    for row in 0..width {
        let mut col = 0;
        while col < width {
            if modules[row * width + col] != Module::Dark {
                col += 1;
                continue;
            }
            let start = col;
            while col < width && modules[row * width + col] == Module::Dark {
                col += 1;
            }
            // PDF y grows upwards; QR rows grow downwards.
            let left = x + (start + QUIET_ZONE) as f32 * unit;
            let right = x + (col + QUIET_ZONE) as f32 * unit;
            let upper = y + size - (row + QUIET_ZONE) as f32 * unit;
            layer.add_rect(Rect::new(Mm(left), Mm(upper - unit), Mm(right), Mm(upper)));
        }
    }
}
