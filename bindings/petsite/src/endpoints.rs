use canary_runner::prelude::{CanaryConfig, CanaryResult, Expect, HttpRequest};
use url::Url;

use crate::pet::Pet;

/// Request builders for the PetSite web front end.
///
/// Every request goes to the scheme, host and port of the configured site URL.
#[derive(Debug, Clone)]
pub struct PetSite {
    base: Url,
}

impl PetSite {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn from_config(config: &CanaryConfig) -> CanaryResult<Self> {
        Ok(Self::new(config.site_url()?.clone()))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    /// `GET /`
    pub fn home(&self) -> HttpRequest {
        HttpRequest::get(self.url("/", &[]))
    }

    /// `GET /?selectedPetType=..&selectedPetColor=..`
    pub fn search(&self, pettype: &str, petcolor: &str) -> HttpRequest {
        HttpRequest::get(self.url(
            "/",
            &[("selectedPetType", pettype), ("selectedPetColor", petcolor)],
        ))
    }

    pub fn search_for(&self, pet: &Pet) -> HttpRequest {
        self.search(&pet.pettype, &pet.petcolor)
    }

    /// `GET /Adoption`
    pub fn adoption_page(&self) -> HttpRequest {
        HttpRequest::get(self.url("/Adoption", &[]))
    }

    /// `GET /Payment`
    pub fn payment_page(&self) -> HttpRequest {
        HttpRequest::get(self.url("/Payment", &[]))
    }

    /// `POST /Adoption/TakeMeHome`
    pub fn take_me_home(&self, pet: &Pet) -> HttpRequest {
        HttpRequest::post_form(
            self.url("/Adoption/TakeMeHome", &[]),
            &[
                ("pettype", pet.pettype.as_str()),
                ("petcolor", pet.petcolor.as_str()),
                ("petid", pet.petid.as_str()),
            ],
        )
    }

    /// `POST /Payment/MakePayment`
    pub fn make_payment(&self, pet: &Pet) -> HttpRequest {
        HttpRequest::post_form(
            self.url("/Payment/MakePayment", &[]),
            &[("pettype", pet.pettype.as_str()), ("petid", pet.petid.as_str())],
        )
    }

    /// `GET /PetListAdoptions`
    pub fn list_adoptions(&self) -> HttpRequest {
        HttpRequest::get(self.url("/PetListAdoptions", &[]))
    }

    /// `GET /pethistory`
    pub fn pet_history(&self) -> HttpRequest {
        HttpRequest::get(self.url("/pethistory", &[]))
    }

    /// `DELETE /pethistory/deletepetadoptionshistory`
    pub fn delete_adoption_history(&self) -> HttpRequest {
        HttpRequest::delete(self.url("/pethistory/deletepetadoptionshistory", &[]))
    }

    /// `GET /housekeeping/`
    pub fn housekeeping(&self) -> HttpRequest {
        HttpRequest::get(self.url("/housekeeping/", &[]))
    }
}

/// The pet search API, which returns every pet as a JSON array.
#[derive(Debug, Clone)]
pub struct SearchApi {
    url: Url,
}

impl SearchApi {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn from_config(config: &CanaryConfig) -> CanaryResult<Self> {
        Ok(Self::new(config.search_api_url()?.clone()))
    }

    /// Fetch all pets. The query string of the configured URL is dropped.
    pub fn all_pets(&self) -> HttpRequest {
        let mut url = self.url.clone();
        url.set_query(None);
        HttpRequest::get(url)
    }

    /// The same request, accepting any non-error status. Used where the API is probed for health
    /// rather than for its data.
    pub fn probe(&self) -> HttpRequest {
        self.all_pets().expect(Expect::Success)
    }

    /// A free text `?query=` search. The API may reject it with a 400, which still shows it is up.
    pub fn query(&self, query: &str) -> HttpRequest {
        let mut url = self.url.clone();
        url.set_query(None);
        url.query_pairs_mut().append_pair("query", query);
        HttpRequest::get(url).expect(Expect::AnyOf(vec![200, 400]))
    }
}
