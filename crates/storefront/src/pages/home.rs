//! Home page: hero carousel, category chips and the product grid.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use askama::Template;
use async_trait::async_trait;
use aries_mall_core::{HeroSlide, Product};
use tokio::task::JoinHandle;
use tracing::debug;

use super::cards::{ProductCardActions, render_grid, skeleton};
use super::{Effect, Page, PageContext, UiEvent};
use crate::api::distinct_categories;
use crate::error::Result;
use crate::outlet::View;

const DESKTOP_FALLBACK: &str = "https://placehold.co/1920x800/f5f3ed/1a1a1a?text=NO+Image";
const MOBILE_FALLBACK: &str = "https://placehold.co/800x800/f5f3ed/1a1a1a?text=NO+Image";
const THUMBNAIL_FALLBACK: &str = "https://placehold.co/150/f5f3ed/1a1a1a?text=Thumb";

/// Grid ordering on the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomeSort {
    #[default]
    Featured,
    PriceLow,
    PriceHigh,
    Rating,
}

impl HomeSort {
    /// Unknown values keep the backend's order.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "price-low" => Self::PriceLow,
            "price-high" => Self::PriceHigh,
            "rating" => Self::Rating,
            _ => Self::Featured,
        }
    }
}

/// Products in `category` (all when `None`), ordered by `sort`.
#[must_use]
pub fn filter_home_products(
    products: &[Product],
    category: Option<&str>,
    sort: HomeSort,
) -> Vec<Product> {
    let mut result: Vec<Product> = products
        .iter()
        .filter(|p| category.is_none_or(|c| p.category == c))
        .cloned()
        .collect();
    match sort {
        HomeSort::Featured => {}
        HomeSort::PriceLow => result.sort_by(|a, b| a.price.cmp(&b.price)),
        HomeSort::PriceHigh => result.sort_by(|a, b| b.price.cmp(&a.price)),
        HomeSort::Rating => result.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
    }
    result
}

struct SlideView {
    title: String,
    description: String,
    button_text: Option<String>,
    button_link: String,
    desktop: String,
    mobile: String,
    thumbnail: String,
    fit_desktop: &'static str,
    fit_mobile: &'static str,
    overlay: bool,
    active: bool,
}

#[derive(Template)]
#[template(path = "partials/hero.html")]
struct HeroTemplate {
    slides: Vec<SlideView>,
}

struct Chip {
    label: String,
    active: bool,
}

#[derive(Template)]
#[template(path = "partials/category_chips.html")]
struct ChipsTemplate {
    chips: Vec<Chip>,
}

#[derive(Template)]
#[template(path = "pages/home.html")]
struct HomeTemplate;

#[derive(Default)]
struct HomeState {
    slides: Vec<HeroSlide>,
    current_slide: usize,
    products: Vec<Product>,
    categories: Vec<String>,
    selected: Option<String>,
    sort: HomeSort,
}

fn render_hero(state: &HomeState) -> Result<String> {
    let slides = state
        .slides
        .iter()
        .enumerate()
        .map(|(i, s)| SlideView {
            title: s.title.clone(),
            description: s.description.clone(),
            button_text: s.button_text.clone().filter(|t| !t.trim().is_empty()),
            button_link: s.button_link.clone().unwrap_or_else(|| "#".to_owned()),
            desktop: s
                .background_image_desktop
                .clone()
                .unwrap_or_else(|| DESKTOP_FALLBACK.to_owned()),
            mobile: s
                .background_image_mobile
                .clone()
                .unwrap_or_else(|| MOBILE_FALLBACK.to_owned()),
            thumbnail: s
                .thumbnail_image
                .clone()
                .unwrap_or_else(|| THUMBNAIL_FALLBACK.to_owned()),
            fit_desktop: s.fit_desktop.as_str(),
            fit_mobile: s.fit_mobile.as_str(),
            overlay: s.overlay,
            active: i == state.current_slide,
        })
        .collect();
    Ok(HeroTemplate { slides }.render()?)
}

fn render_chips(state: &HomeState) -> Result<String> {
    let all = Chip {
        label: "All".to_owned(),
        active: state.selected.is_none(),
    };
    let chips = std::iter::once(all)
        .chain(state.categories.iter().map(|c| Chip {
            label: c.clone(),
            active: state.selected.as_deref() == Some(c.as_str()),
        }))
        .collect();
    Ok(ChipsTemplate { chips }.render()?)
}

/// `/`
pub struct HomePage {
    ctx: PageContext,
    actions: ProductCardActions,
    state: Arc<Mutex<HomeState>>,
    autoplay: Mutex<Option<JoinHandle<()>>>,
}

impl HomePage {
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        Self {
            actions: ProductCardActions::new(ctx.clone()),
            ctx,
            state: Arc::new(Mutex::new(HomeState::default())),
            autoplay: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HomeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render_grid(&self, view: &View) -> Result<()> {
        let (visible, title) = {
            let state = self.lock();
            (
                filter_home_products(&state.products, state.selected.as_deref(), state.sort),
                state
                    .selected
                    .clone()
                    .unwrap_or_else(|| "All Products".to_owned()),
            )
        };
        view.set("grid-title", title)?;
        view.set(
            "grid",
            render_grid(&self.actions.cards(&visible), "No products found.")?,
        )
    }

    /// (Re)starts the carousel timer. Any previous timer is aborted.
    fn start_autoplay(&self, view: &View) {
        let count = self.lock().slides.len();
        let previous = if count > 1 {
            let state = Arc::clone(&self.state);
            let view = view.clone();
            let period = self.ctx.slide_interval;
            let handle = tokio::spawn(autoplay(state, view, period));
            self.autoplay
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(handle)
        } else {
            self.autoplay
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
        };
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

async fn autoplay(state: Arc<Mutex<HomeState>>, view: View, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let html = {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.slides.is_empty() {
                return;
            }
            state.current_slide = (state.current_slide + 1) % state.slides.len();
            render_hero(&state)
        };
        match html.and_then(|html| view.set("hero", html)) {
            Ok(()) => {}
            Err(e) => {
                debug!(error = %e, "Hero autoplay stopped");
                return;
            }
        }
    }
}

#[async_trait]
impl Page for HomePage {
    fn name(&self) -> &'static str {
        "home"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        HomeTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        view.set("grid", skeleton(8))?;

        let catalog = &self.ctx.catalog;
        let (slides, products) = tokio::join!(catalog.hero_slides(), catalog.products());
        let categories = distinct_categories(&products);

        let (hero, chips) = {
            let mut state = self.lock();
            state.slides = slides;
            state.current_slide = 0;
            state.products = products;
            state.categories = categories;
            (render_hero(&state)?, render_chips(&state)?)
        };
        view.set_title("Aries Mall")?;
        view.set("hero", hero)?;
        view.set("categories", chips)?;
        self.render_grid(view)?;
        self.start_autoplay(view);
        Ok(())
    }

    async fn handle(&self, view: &View, event: UiEvent) -> Result<Effect> {
        match event {
            UiEvent::SelectCategory(category) => {
                let chips = {
                    let mut state = self.lock();
                    state.selected = category.filter(|c| c != "All");
                    render_chips(&state)?
                };
                view.set("categories", chips)?;
                self.render_grid(view)?;
            }
            UiEvent::SortBy(value) => {
                self.lock().sort = HomeSort::parse(&value);
                self.render_grid(view)?;
            }
            UiEvent::SelectSlide(index) => {
                let hero = {
                    let mut state = self.lock();
                    if index >= state.slides.len() {
                        return Ok(Effect::None);
                    }
                    state.current_slide = index;
                    render_hero(&state)?
                };
                view.set("hero", hero)?;
                self.start_autoplay(view);
            }
            UiEvent::AddToCart { product_id } => {
                let products = self.lock().products.clone();
                self.actions.add_to_cart(&product_id, &products).await;
            }
            UiEvent::ToggleWishlist { product_id } => {
                self.actions.toggle_wishlist(&product_id).await;
                self.render_grid(view)?;
            }
            _ => {}
        }
        Ok(Effect::None)
    }

    fn cleanup(&self) {
        if let Some(handle) = self
            .autoplay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
