//! Product manager: searchable product table with create, edit and delete.
//! The page also hosts the homepage slide manager.

use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use askama::Template;
use aries_mall_core::{Price, Product, ProductDraft, ProductId};
use aries_mall_storefront::outlet::View;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{error, info};

use super::slides::SlideManager;
use super::{AdminContext, AdminEvent, Effect, Page};
use crate::components::{Cell, DataTable, TableColumn, TableRow};
use crate::error::{AdminError, Result};

const PLACEHOLDER_IMAGE: &str = "https://placehold.co/100x100?text=No+Img";
const DELETE_PROMPT: &str = "Are you sure you want to delete this product?";

/// Values of the product form, as typed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductForm {
    /// `None` creates a new product.
    pub id: Option<ProductId>,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: String,
    pub description: String,
    pub image_main: String,
    /// Comma separated
    pub images_gallery: String,
    /// Comma separated
    pub features: String,
    pub warranty: String,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

impl ProductForm {
    /// Prefills the form for editing; the first image is the main one.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        let (main, gallery) = match product.images.split_first() {
            Some((main, rest)) => (main.clone(), rest.join(", ")),
            None => (String::new(), String::new()),
        };
        Self {
            id: Some(product.id.clone()),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            price: product.price.amount().to_string(),
            description: product.description.clone(),
            image_main: main,
            images_gallery: gallery,
            features: product.features.join(", "),
            warranty: product.warranty.clone().unwrap_or_default(),
        }
    }

    /// Builds the row to write.
    ///
    /// The image list is the main image followed by the gallery. A gallery
    /// without a main image keeps an empty first slot so the gallery never
    /// becomes the main image.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a missing name or an unparsable price.
    pub fn to_draft(&self) -> Result<ProductDraft> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AdminError::Validation("Product name is required.".into()));
        }
        let price = Decimal::from_str(self.price.trim())
            .map_err(|_| AdminError::Validation("Price must be a number.".into()))?;

        let main = self.image_main.trim();
        let gallery = split_list(&self.images_gallery);
        let images = if main.is_empty() && gallery.is_empty() {
            Vec::new()
        } else {
            std::iter::once(main.to_owned()).chain(gallery).collect()
        };

        let warranty = self.warranty.trim();
        Ok(ProductDraft {
            name: name.to_owned(),
            brand: self.brand.trim().to_owned(),
            category: self.category.trim().to_owned(),
            price: Price::new(price),
            description: self.description.trim().to_owned(),
            images,
            features: split_list(&self.features),
            warranty: (!warranty.is_empty()).then(|| warranty.to_owned()),
        })
    }
}

/// Products whose name, category or brand contain `query`, ignoring case.
#[must_use]
pub fn filter_products<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    let query = query.trim().to_lowercase();
    products
        .iter()
        .filter(|p| {
            query.is_empty()
                || p.name.to_lowercase().contains(&query)
                || p.category.to_lowercase().contains(&query)
                || p.brand.to_lowercase().contains(&query)
        })
        .collect()
}

#[derive(Template)]
#[template(path = "pages/product_manager.html")]
struct ProductManagerTemplate;

#[derive(Template)]
#[template(path = "partials/product_form.html")]
struct ProductModalTemplate<'a> {
    title: &'a str,
    form: &'a ProductForm,
}

/// `#/product-manager`
pub struct ProductManagerPage {
    ctx: AdminContext,
    products: Mutex<Vec<Product>>,
    query: Mutex<String>,
    slides: SlideManager,
}

impl ProductManagerPage {
    #[must_use]
    pub fn new(ctx: AdminContext) -> Self {
        Self {
            slides: SlideManager::new(ctx.clone()),
            ctx,
            products: Mutex::new(Vec::new()),
            query: Mutex::new(String::new()),
        }
    }

    async fn fetch(&self, view: &View) -> Result<()> {
        match self.ctx.backend()?.products().await {
            Ok(products) => {
                *self.products.lock().unwrap_or_else(PoisonError::into_inner) = products;
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch products");
                self.ctx.toasts.error("Error", "Could not fetch products.");
            }
        }
        self.render_table(view)
    }

    fn render_table(&self, view: &View) -> Result<()> {
        let query = self.query.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let products = self.products.lock().unwrap_or_else(PoisonError::into_inner);
        let rows = filter_products(&products, &query)
            .into_iter()
            .map(|p| TableRow {
                id: p.id.to_string(),
                cells: vec![
                    Cell::image(p.primary_image().unwrap_or(PLACEHOLDER_IMAGE), &p.name),
                    Cell::text(&p.name),
                    Cell::text(&p.category),
                    Cell::text(p.price.display()),
                ],
            })
            .collect();
        drop(products);

        let html = DataTable::new("products")
            .column(TableColumn::new("image", "Image"))
            .column(TableColumn::new("name", "Name"))
            .column(TableColumn::new("category", "Category"))
            .column(TableColumn::new("price", "Price"))
            .empty_state("No products found.")
            .rows(rows)
            .render()?;
        view.set("products-table", html)?;
        Ok(())
    }

    fn open_modal(&self, view: &View, id: Option<&ProductId>) -> Result<()> {
        let existing = id.and_then(|id| {
            self.products
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|p| p.id == *id)
                .map(ProductForm::from_product)
        });
        let (title, form) = match existing {
            Some(form) => ("Edit Product", form),
            None => ("Add New Product", ProductForm::default()),
        };
        let html = ProductModalTemplate {
            title,
            form: &form,
        }
        .render()?;
        view.set("modal", html)?;
        Ok(())
    }

    async fn save(&self, view: &View, form: &ProductForm) -> Result<()> {
        let backend = self.ctx.backend()?;
        let outcome = match form.to_draft() {
            Ok(draft) => match &form.id {
                Some(id) => backend.update_product(id, &draft).await,
                None => backend.insert_product(&draft).await,
            }
            .map_err(AdminError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            error!(error = %e, "Failed to save product");
            self.ctx
                .toasts
                .error("Error", format!("Could not save product: {}", e.user_message()));
            return Ok(());
        }

        let verb = if form.id.is_some() { "updated" } else { "created" };
        info!(product = %form.name, verb, "Product saved");
        self.ctx
            .toasts
            .success("Success", format!("Product successfully {verb}."));
        view.set("modal", "")?;
        self.fetch(view).await
    }

    async fn delete(&self, view: &View, id: &ProductId) -> Result<()> {
        if !self.ctx.confirm.confirm(DELETE_PROMPT) {
            return Ok(());
        }
        if let Err(e) = self.ctx.backend()?.delete_product(id).await {
            error!(error = %e, product_id = %id, "Failed to delete product");
            self.ctx.toasts.error("Error", "Could not delete product.");
            return Ok(());
        }
        self.ctx.toasts.success("Success", "Product deleted.");
        self.fetch(view).await
    }
}

#[async_trait]
impl Page for ProductManagerPage {
    fn name(&self) -> &'static str {
        "product-manager"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        ProductManagerTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        view.set("modal", "")?;
        self.fetch(view).await?;
        self.slides.fetch(view).await
    }

    async fn handle(&self, view: &View, event: AdminEvent) -> Result<Effect> {
        match event {
            AdminEvent::SearchProducts(query) => {
                *self.query.lock().unwrap_or_else(PoisonError::into_inner) = query;
                self.render_table(view)?;
            }
            AdminEvent::EditProduct(id) => self.open_modal(view, id.as_ref())?,
            AdminEvent::SaveProduct(form) => self.save(view, &form).await?,
            AdminEvent::DeleteProduct(id) => self.delete(view, &id).await?,
            AdminEvent::CloseModal => view.set("modal", "")?,
            AdminEvent::EditSlide(id) => self.slides.open_modal(view, id.as_ref())?,
            AdminEvent::SaveSlide(form) => self.slides.save(view, &form).await?,
            AdminEvent::DeleteSlide(id) => self.slides.delete(view, &id).await?,
            _ => {}
        }
        Ok(Effect::None)
    }
}
