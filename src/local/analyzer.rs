//! Response analyzer driven by a list of response parsers

use super::new_base;
use crate::component::{
    Analyzer, CalculateScore, Component, ComponentBase, ComponentId, ComponentType, Data,
    HttpResponse, Response,
};
use crate::{CrawlerError, ErrorType};
use async_trait::async_trait;
use tracing::{debug, info};

/// Extracts data from one HTTP response
///
/// The second argument is the depth of the response. Parsers do not need to
/// set the depth of the requests they produce; the analyzer does that.
pub type ParseResponse =
    Box<dyn Fn(&HttpResponse, u32) -> (Vec<Data>, Vec<anyhow::Error>) + Send + Sync>;

/// Analyzer running every parser over the same response
pub struct ResponseAnalyzer {
    base: ComponentBase,
    parsers: Vec<ParseResponse>,
}

impl ResponseAnalyzer {
    /// Creates an analyzer
    ///
    /// # Arguments
    ///
    /// * `id` - A legal analyzer ID
    /// * `parsers` - Response parsers, applied in order; must not be empty
    /// * `score_calculator` - Scoring function, the default one if `None`
    pub fn new(
        id: ComponentId,
        parsers: Vec<ParseResponse>,
        score_calculator: Option<CalculateScore>,
    ) -> crate::Result<Self> {
        let base = new_base(id, score_calculator, ComponentType::Analyzer)?;
        if parsers.is_empty() {
            return Err(CrawlerError::illegal_parameter(
                ErrorType::Analyzer,
                "empty response parser list",
            ));
        }
        Ok(Self { base, parsers })
    }

    pub fn parser_number(&self) -> usize {
        self.parsers.len()
    }
}

impl std::fmt::Debug for ResponseAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseAnalyzer")
            .field("base", &self.base)
            .field("parsers", &self.parsers.len())
            .finish()
    }
}

impl Component for ResponseAnalyzer {
    fn base(&self) -> &ComponentBase {
        &self.base
    }
}

#[async_trait]
impl Analyzer for ResponseAnalyzer {
    async fn analyze(&self, resp: Response) -> (Vec<Data>, Vec<anyhow::Error>) {
        let _handling = self.base.start_handling();
        self.base.incr_called_count();
        if !resp.valid() {
            let err = CrawlerError::illegal_parameter(
                ErrorType::Analyzer,
                format!("response without body: {}", resp.url()),
            );
            return (Vec::new(), vec![err.into()]);
        }
        self.base.incr_accepted_count();

        let depth = resp.depth();
        info!("Parse the response (URL: {}, depth: {})...", resp.url(), depth);
        let mut data_list = Vec::new();
        let mut error_list = Vec::new();
        for parser in &self.parsers {
            let (data, errors) = parser(resp.http_resp(), depth);
            data_list.extend(data.into_iter().map(|datum| with_child_depth(datum, depth)));
            error_list.extend(errors);
        }
        debug!(
            "Parsed {} (data: {}, errors: {})",
            resp.url(),
            data_list.len(),
            error_list.len()
        );

        if error_list.is_empty() {
            self.base.incr_completed_count();
        }
        (data_list, error_list)
    }
}

/// Requests found in a response of depth `n` are one level deeper
fn with_child_depth(datum: Data, depth: u32) -> Data {
    match datum {
        Data::Request(mut req) => {
            req.set_depth(depth.saturating_add(1));
            Data::Request(req)
        }
        item => item,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Item, Request};
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use url::Url;

    fn response(body: Option<&str>, depth: u32) -> Response {
        Response::new(
            HttpResponse {
                url: Url::parse("http://example.com/").unwrap(),
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: body.map(|b| b.as_bytes().to_vec()),
            },
            depth,
        )
    }

    fn link_parser() -> ParseResponse {
        Box::new(|resp, depth| {
            let url = resp.url.join("/next").unwrap();
            // Deliberately wrong depth; the analyzer corrects it
            (vec![Request::get(url, depth + 7).into()], Vec::new())
        })
    }

    fn item_parser() -> ParseResponse {
        Box::new(|resp, _| {
            let mut item = Item::new();
            item.insert("url", resp.url.as_str());
            (vec![item.into()], Vec::new())
        })
    }

    fn failing_parser() -> ParseResponse {
        Box::new(|_, _| (Vec::new(), vec![anyhow::anyhow!("unparsable body")]))
    }

    #[test]
    fn test_new_rejects_empty_parser_list() {
        let err = ResponseAnalyzer::new(ComponentId::from("A1"), Vec::new(), None).unwrap_err();
        assert!(err.is_illegal_parameter());
        assert_eq!(err.error_type(), ErrorType::Analyzer);
    }

    #[tokio::test]
    async fn test_analyze_runs_every_parser() {
        let analyzer = ResponseAnalyzer::new(
            ComponentId::from("A1"),
            vec![link_parser(), item_parser()],
            None,
        )
        .unwrap();
        assert_eq!(analyzer.parser_number(), 2);

        let (data, errors) = analyzer.analyze(response(Some("<html/>"), 2)).await;
        assert!(errors.is_empty());
        assert_eq!(data.len(), 2);
        match &data[0] {
            Data::Request(req) => {
                assert_eq!(req.url().as_str(), "http://example.com/next");
                assert_eq!(req.depth(), 3);
            }
            other => panic!("expected a request, got {:?}", other),
        }
        assert!(matches!(&data[1], Data::Item(item) if item.contains_key("url")));
        assert_eq!(analyzer.counts().completed_count, 1);
        assert_eq!(analyzer.handling_number(), 0);
    }

    #[tokio::test]
    async fn test_parser_errors_prevent_completion() {
        let analyzer = ResponseAnalyzer::new(
            ComponentId::from("A2"),
            vec![failing_parser(), item_parser()],
            None,
        )
        .unwrap();

        let (data, errors) = analyzer.analyze(response(Some(""), 0)).await;
        assert_eq!(data.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(analyzer.counts().accepted_count, 1);
        assert_eq!(analyzer.counts().completed_count, 0);
    }

    #[tokio::test]
    async fn test_response_without_body_is_rejected() {
        let analyzer =
            ResponseAnalyzer::new(ComponentId::from("A3"), vec![item_parser()], None).unwrap();

        let (data, errors) = analyzer.analyze(response(None, 0)).await;
        assert!(data.is_empty());
        let err = errors.into_iter().next().unwrap().downcast::<CrawlerError>().unwrap();
        assert!(err.is_illegal_parameter());
        assert_eq!(analyzer.counts().called_count, 1);
        assert_eq!(analyzer.counts().accepted_count, 0);
    }
}
