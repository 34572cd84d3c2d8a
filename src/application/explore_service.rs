// Explore service - ready-made cards that can be transplanted onto any dashboard
use crate::application::dashboard_service::DashboardService;
use crate::domain::card::{Card, ConversationHistory, IntervalSettings};
use crate::domain::geometry::{Size, SPAWN_POSITION};
use crate::domain::ids::DashboardId;
use serde::Serialize;
use std::sync::Arc;

pub const TRANSPLANT_SIZE: Size = Size {
    width: 400.0,
    height: 300.0,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreCard {
    pub id: String,
    pub title: String,
    pub conversation_history: ConversationHistory,
    pub interval_settings: IntervalSettings,
}

impl ExploreCard {
    fn new(
        id: &str,
        title: &str,
        prompt: &str,
        html: &str,
        interval_settings: IntervalSettings,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            conversation_history: ConversationHistory::new(prompt, html),
            interval_settings,
        }
    }
}

#[derive(Clone)]
pub struct ExploreService {
    cards: Arc<Vec<ExploreCard>>,
    dashboards: DashboardService,
}

impl ExploreService {
    pub fn new(dashboards: DashboardService, cards: Vec<ExploreCard>) -> Self {
        Self {
            cards: Arc::new(cards),
            dashboards,
        }
    }

    pub fn with_seed_catalog(dashboards: DashboardService) -> Self {
        Self::new(dashboards, seed_catalog())
    }

    pub fn cards(&self) -> &[ExploreCard] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&ExploreCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Places a copy of the explore card on `dashboard_id`. The catalog entry is
    /// not consumed and can be transplanted again.
    pub fn transplant(&self, card_id: &str, dashboard_id: &DashboardId) -> Option<Card> {
        let source = self.card(card_id)?;
        let card = Card::new(
            SPAWN_POSITION,
            TRANSPLANT_SIZE,
            source.conversation_history.html.clone(),
            source.conversation_history.clone(),
            source.interval_settings.clone(),
        );

        let added = self.dashboards.add_card(dashboard_id, card)?;
        tracing::info!(
            explore_card = card_id,
            dashboard_id = %dashboard_id,
            card_id = %added.id,
            "Transplanted explore card"
        );
        Some(added)
    }
}

const TRADING_VIEW_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width,initial-scale=1" />
  <title>TradingView Widget</title>
  <style>
    body, html { background: #18181b; color: #fafafa; width: 100vw; height: 100vh; margin: 0; padding: 0; }
    #chart { width: 100vw; height: 100vh; min-height: 400px; }
  </style>
</head>
<body>
  <div id="chart"></div>
  <script type="text/javascript" src="https://s3.tradingview.com/tv.js"></script>
  <script type="text/javascript">
    new TradingView.widget({
      "width": "100%", "height": "100%", "symbol": "NASDAQ:AAPL", "interval": "D",
      "timezone": "Etc/UTC", "theme": "dark", "style": "1", "locale": "en",
      "toolbar_bg": "#18181b", "backgroundColor": "#18181b", "container_id": "chart"
    });
  </script>
</body>
</html>"##;

const TESLA_STOCK_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Tesla Stock Dashboard</title>
  <style>
    body { background: #111827; color: #f3f4f6; font-family: sans-serif; margin: 0; padding: 24px; }
    .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 16px; }
    .tile { background: #1f2937; border-radius: 8px; padding: 16px; }
    .label { color: #9ca3af; font-size: 12px; }
    .value { font-size: 22px; font-weight: 600; }
  </style>
</head>
<body>
  <h1>Tesla Stock Dashboard</h1>
  <div class="grid">
    <div class="tile"><div class="label">Stock Price</div><div class="value">$-</div></div>
    <div class="tile"><div class="label">Market Cap</div><div class="value">-</div></div>
    <div class="tile"><div class="label">P/E Ratio</div><div class="value">-</div></div>
    <div class="tile"><div class="label">52 Week Range</div><div class="value">-</div></div>
    <div class="tile"><div class="label">Revenue (TTM)</div><div class="value">-</div></div>
    <div class="tile"><div class="label">Deliveries</div><div class="value">-</div></div>
  </div>
</body>
</html>"##;

const FINANCIAL_NEWS_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Financial News</title>
  <style>
    body { background: #111827; color: #f3f4f6; font-family: sans-serif; margin: 0; padding: 24px; }
    .alert { background: #7f1d1d; border-radius: 8px; padding: 12px 16px; margin-bottom: 16px; }
    li { margin-bottom: 8px; }
  </style>
</head>
<body>
  <h1>Financial News</h1>
  <div class="alert"><strong>Market Alert</strong><p>-</p></div>
  <h2>Latest Updates</h2>
  <ul><li>S&amp;P 500</li><li>Tariffs</li><li>Gold</li><li>Tesla</li></ul>
</body>
</html>"##;

fn seed_catalog() -> Vec<ExploreCard> {
    vec![
        ExploreCard::new(
            "explore-trading-view",
            "TradingView Chart",
            "Create a TradingView chart widget",
            TRADING_VIEW_HTML,
            IntervalSettings {
                is_enabled: false,
                interval: 5,
                prompt: "Update TradingView chart data".to_string(),
            },
        ),
        ExploreCard::new(
            "explore-tesla-stock",
            "Tesla Stock Dashboard",
            "Create the most important indicators and metrics to analyze Tesla (TSLA) stock.",
            TESLA_STOCK_HTML,
            IntervalSettings::enabled(
                1440,
                "Update the HTML file with the latest Tesla stock data. Do not change the structure of the HTML file.",
            ),
        ),
        ExploreCard::new(
            "explore-financial-news",
            "Financial News",
            "Create a dashboard that displays the latest financial news and updates.",
            FINANCIAL_NEWS_HTML,
            IntervalSettings::enabled(
                1440,
                "Update the HTML file with the latest financial news data. Do not change the structure of the HTML file. \
                 Market Alert should be updated with the latest most important news like FED Update, Tariff Concerns, \
                 Commodities, Trump Admin, etc. Latest Updates should be updated with the latest news like S&P 500, \
                 Tariffs, Gold, Trump Admin, Tesla, etc.",
            ),
        ),
        ExploreCard::new(
            "explore-weather",
            "Weather",
            "Create a weather card for San Francisco",
            r##"<!DOCTYPE html><html><head><meta name="viewport" content="width=device-width,initial-scale=1"><style>body{background:#18181b;color:#fafafa;font-family:sans-serif;text-align:center;padding-top:40px}.temp{font-size:48px}</style></head><body><div>San Francisco</div><div class="temp">18&deg;C</div><div>Partly cloudy</div></body></html>"##,
            IntervalSettings::enabled(60, "Update the weather with current conditions"),
        ),
        ExploreCard::new(
            "explore-world-clock",
            "World Clock",
            "Create a world clock showing New York, London and Tokyo",
            r##"<!DOCTYPE html><html><head><meta name="viewport" content="width=device-width,initial-scale=1"><style>body{background:#18181b;color:#fafafa;font-family:sans-serif;display:flex;gap:24px;justify-content:center;align-items:center;height:100vh;margin:0}</style></head><body><div id="ny"></div><div id="ldn"></div><div id="tyo"></div><script>function t(z){return new Date().toLocaleTimeString('en-US',{timeZone:z})}function r(){ny.textContent='New York '+t('America/New_York');ldn.textContent='London '+t('Europe/London');tyo.textContent='Tokyo '+t('Asia/Tokyo')}r();setInterval(r,1000)</script></body></html>"##,
            IntervalSettings::default(),
        ),
        ExploreCard::new(
            "explore-todo",
            "To-Do",
            "Create a simple to-do list",
            r##"<!DOCTYPE html><html><head><meta name="viewport" content="width=device-width,initial-scale=1"><style>body{background:#18181b;color:#fafafa;font-family:sans-serif;padding:16px}input{background:#232326;color:#fafafa;border:1px solid #27272a}</style></head><body><input id="item" placeholder="Add a task"><ul id="list"></ul><script>item.addEventListener('keydown',e=>{if(e.key==='Enter'&&item.value){const li=document.createElement('li');li.textContent=item.value;list.appendChild(li);item.value=''}})</script></body></html>"##,
            IntervalSettings::default(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_store::DashboardStore;
    use crate::application::events::EventBus;
    use crate::application::refresh_scheduler::tests::{settle, ScriptedGenerator};
    use crate::application::refresh_scheduler::RefreshScheduler;
    use crate::domain::dashboard::MAX_CARDS_PER_DASHBOARD;

    fn explore(generator: Arc<ScriptedGenerator>) -> ExploreService {
        let store = DashboardStore::new(EventBus::new());
        let scheduler = RefreshScheduler::new(store.clone(), generator.clone());
        ExploreService::with_seed_catalog(DashboardService::new(store, scheduler, generator))
    }

    #[tokio::test]
    async fn test_seed_catalog_order_and_schedules() {
        let explore = explore(ScriptedGenerator::html("<p/>"));
        let ids: Vec<&str> = explore.cards().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "explore-trading-view",
                "explore-tesla-stock",
                "explore-financial-news",
                "explore-weather",
                "explore-world-clock",
                "explore-todo",
            ]
        );

        let trading_view = explore.card("explore-trading-view").unwrap();
        assert!(!trading_view.interval_settings.is_enabled);
        assert_eq!(trading_view.interval_settings.interval, 5);

        let news = explore.card("explore-financial-news").unwrap();
        assert!(news.interval_settings.should_run());
        assert_eq!(news.interval_settings.interval, 1440);
        assert!(news.interval_settings.prompt.contains("Market Alert should be updated"));
        assert!(!news.interval_settings.prompt.contains('\\'));
    }

    #[tokio::test]
    async fn test_transplant_copies_history_and_settings() {
        let explore = explore(ScriptedGenerator::html("<p/>"));
        let dashboard = explore.dashboards.create_dashboard("Demo", "").unwrap();
        let source = explore.card("explore-world-clock").unwrap().clone();

        let card = explore.transplant(&source.id, &dashboard.id).unwrap();

        assert_eq!(card.position(), SPAWN_POSITION);
        assert_eq!(card.size(), Size::new(400.0, 300.0));
        assert_eq!(card.html, source.conversation_history.html);
        assert_eq!(card.conversation_history, source.conversation_history);
        assert_eq!(card.interval_settings, source.interval_settings);
        assert_eq!(explore.card("explore-world-clock"), Some(&source));
    }

    #[tokio::test]
    async fn test_transplant_is_repeatable_and_capped() {
        let explore = explore(ScriptedGenerator::html("<p/>"));
        let first = explore.dashboards.create_dashboard("First", "").unwrap();
        let second = explore.dashboards.create_dashboard("Second", "").unwrap();

        let a = explore.transplant("explore-todo", &first.id).unwrap();
        let b = explore.transplant("explore-todo", &second.id).unwrap();
        assert_ne!(a.id, b.id);

        for _ in 1..MAX_CARDS_PER_DASHBOARD {
            explore.transplant("explore-todo", &first.id);
        }
        assert!(explore.transplant("explore-todo", &first.id).is_none());
        assert!(explore.transplant("missing", &second.id).is_none());
        assert_eq!(
            explore.dashboards.dashboard(&first.id).unwrap().cards.len(),
            MAX_CARDS_PER_DASHBOARD
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transplanted_card_starts_refreshing() {
        let generator = ScriptedGenerator::html("<div>fresh</div>");
        let explore = explore(generator.clone());
        let dashboard = explore.dashboards.create_dashboard("Demo", "").unwrap();

        let card = explore.transplant("explore-weather", &dashboard.id).unwrap();
        settle().await;

        assert_eq!(generator.calls(), 1);
        let stored = explore.dashboards.store().card(&dashboard.id, &card.id).unwrap();
        assert_eq!(stored.html, "<div>fresh</div>");
        assert_eq!(
            stored.conversation_history.prompts,
            "Create a weather card for San Francisco\nUpdate the weather with current conditions"
        );
    }
}
