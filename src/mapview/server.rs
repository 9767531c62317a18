use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};

/// A map rendered once at startup; every request serves the same bytes.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub page: String,
    pub overlay: String,
    pub legend: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(overlay_geojson)
        .service(legend_json);
}

#[get("/")]
async fn index(map: web::Data<RenderedMap>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(map.page.clone())
}

#[get("/overlay.geojson")]
async fn overlay_geojson(map: web::Data<RenderedMap>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/geo+json")
        .body(map.overlay.clone())
}

#[get("/legend.json")]
async fn legend_json(map: web::Data<RenderedMap>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(map.legend.clone())
}

pub async fn serve(map: RenderedMap, address: &str, port: u16) -> std::io::Result<()> {
    let map = web::Data::new(map);
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(map.clone())
            .configure(config)
    })
    .bind((address, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, http::StatusCode};

    fn rendered() -> RenderedMap {
        RenderedMap {
            page: "<!DOCTYPE html><html></html>".to_string(),
            overlay: r#"{"type":"FeatureCollection","features":[]}"#.to_string(),
            legend: r#"{"entries":[]}"#.to_string(),
        }
    }

    #[actix_web::test]
    async fn test_routes_serve_rendered_map() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(rendered()))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "<!DOCTYPE html><html></html>");

        let req = test::TestRequest::get().uri("/overlay.geojson").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/geo+json"
        );

        let req = test::TestRequest::get().uri("/legend.json").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, r#"{"entries":[]}"#);

        let req = test::TestRequest::get().uri("/missing").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
